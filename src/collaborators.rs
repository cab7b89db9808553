//! Narrow capabilities the orchestrator calls into.
//!
//! Each trait is one concern owned elsewhere (storage, tabs, icon, news...).
//! They are injected at construction through [`Collaborators`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dispatcher::SvgEncoding;
use crate::error::ExtensionResult;
use crate::extension::ExtensionData;
use crate::settings::{Theme, UserSettings};
use crate::state::ExtensionState;
use crate::theme::SystemColorScheme;

// ============================================================================
// Storage
// ============================================================================

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> ExtensionResult<UserSettings>;
    async fn save(&self, settings: &UserSettings) -> ExtensionResult<()>;
    /// Persist the sync preference itself, outside of the settings record
    async fn save_sync_flag(&self, sync: bool) -> ExtensionResult<()>;
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self) -> ExtensionResult<ExtensionState>;
    async fn save(&self, state: &ExtensionState) -> ExtensionResult<()>;
}

// ============================================================================
// Host surfaces
// ============================================================================

#[async_trait]
pub trait TabNotifier: Send + Sync {
    async fn active_url(&self) -> Option<String>;
    async fn can_access_active_tab(&self) -> bool;
    /// Ask every open document to request its descriptor again
    async fn notify_all(&self) -> ExtensionResult<()>;
}

#[async_trait]
pub trait WindowTheme: Send + Sync {
    async fn apply(&self, theme: &Theme) -> ExtensionResult<()>;
    async fn reset(&self) -> ExtensionResult<()>;
}

pub trait IconController: Send + Sync {
    fn set_active(&self);
    fn set_inactive(&self);
    fn show_important_badge(&self);
    fn hide_badge(&self);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub date: String,
    pub headline: String,
    pub url: String,
    pub important: bool,
    pub read: bool,
}

#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn subscribe(&self);
    async fn unsubscribe(&self);
    /// Newest first
    async fn latest(&self) -> Vec<NewsItem>;
}

/// Named one-shot timers. Arming a name replaces its pending fire.
pub trait AlarmScheduler: Send + Sync {
    fn arm_once(&self, name: &str, when: DateTime<Utc>);
    fn cancel(&self, name: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ContextMenus,
}

#[async_trait]
pub trait Permissions: Send + Sync {
    async fn has(&self, capability: Capability) -> bool;
}

#[async_trait]
pub trait ContextMenus: Send + Sync {
    async fn create_entries(&self) -> ExtensionResult<()>;
    async fn remove_all(&self) -> ExtensionResult<()>;
}

#[async_trait]
pub trait Shortcuts: Send + Sync {
    async fn all(&self) -> BTreeMap<String, String>;
    async fn set(&self, command: &str, binding: &str) -> ExtensionResult<bool>;
}

/// Anything rendering UI from the aggregate snapshot (popup, devtools)
#[async_trait]
pub trait UiObserver: Send + Sync {
    async fn report(&self, data: &ExtensionData);
}

// ============================================================================
// Config & rendering
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevtoolsData {
    pub dynamic_fixes_text: String,
    pub filter_fixes_text: String,
    pub static_themes_text: String,
}

/// Fetched site configuration (dark list, fixes, color schemes)
pub trait SiteConfig: Send + Sync {
    fn is_in_dark_list(&self, url: &str) -> bool;
    fn dynamic_fixes(&self, url: &str, frame_url: Option<&str>) -> Option<Value>;
    fn inversion_fixes(&self, url: &str) -> Option<Value>;
    fn static_themes(&self, url: &str) -> Option<Value>;
    fn color_schemes(&self) -> Value;
    fn devtools(&self) -> DevtoolsData;
}

/// Stylesheet generators for the non-dynamic engines
pub trait StyleRenderer: Send + Sync {
    fn css_filter(&self, theme: &Theme, url: &str, is_top_frame: bool, fixes: Option<&Value>) -> String;
    fn svg_filter(
        &self,
        theme: &Theme,
        url: &str,
        is_top_frame: bool,
        fixes: Option<&Value>,
        encoding: SvgEncoding,
    ) -> String;
    /// `(matrix, reverse_matrix)` for inline SVG filters
    fn svg_matrices(&self, theme: &Theme) -> (String, String);
    fn static_stylesheet(
        &self,
        theme: &Theme,
        url: &str,
        is_top_frame: bool,
        themes: Option<&Value>,
    ) -> String;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything the orchestrator is constructed with
pub struct Collaborators {
    pub settings_store: Arc<dyn SettingsStore>,
    pub state_store: Arc<dyn StateStore>,
    pub tabs: Arc<dyn TabNotifier>,
    pub window_theme: Arc<dyn WindowTheme>,
    pub icon: Arc<dyn IconController>,
    pub news: Arc<dyn NewsFeed>,
    pub alarms: Arc<dyn AlarmScheduler>,
    pub permissions: Arc<dyn Permissions>,
    pub context_menus: Arc<dyn ContextMenus>,
    pub shortcuts: Arc<dyn Shortcuts>,
    pub observer: Arc<dyn UiObserver>,
    pub site_config: Arc<dyn SiteConfig>,
    pub renderer: Arc<dyn StyleRenderer>,
    pub color_scheme: SystemColorScheme,
    pub clock: Arc<dyn Clock>,
    pub svg_encoding: SvgEncoding,
}
