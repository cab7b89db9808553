//! Log-only collaborators for running the engine without a browser.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::time::Duration;

use crate::collaborators::{
    Capability, ContextMenus, DevtoolsData, IconController, NewsFeed, NewsItem, Permissions,
    Shortcuts, SiteConfig, StyleRenderer, TabNotifier, UiObserver, WindowTheme,
};
use crate::commands::COMMAND_DEBOUNCE;
use crate::dispatcher::SvgEncoding;
use crate::error::ExtensionResult;
use crate::extension::ExtensionData;
use crate::settings::Theme;
use crate::sites;

const DEFAULT_DATA_DIR: &str = "umbra-data";

/// Host configuration, read from `UMBRA_*` environment variables
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub data_dir: PathBuf,
    pub debounce: Duration,
    pub svg_encoding: SvgEncoding,
    /// Patterns treated as dark by default
    pub dark_sites: Vec<String>,
}

impl HostConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("UMBRA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let debounce = std::env::var("UMBRA_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(COMMAND_DEBOUNCE);

        let svg_encoding = match std::env::var("UMBRA_SVG_DATA_URL").as_deref() {
            Ok("1") | Ok("true") => SvgEncoding::DataUrl,
            _ => SvgEncoding::Inline,
        };

        let dark_sites = std::env::var("UMBRA_DARK_SITES")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            data_dir,
            debounce,
            svg_encoding,
            dark_sites,
        }
    }
}

/// Single pretend tab whose URL is set from the terminal
#[derive(Default)]
pub struct LogTabs {
    active: Mutex<Option<String>>,
}

impl LogTabs {
    pub fn open(&self, url: &str) {
        if let Ok(mut active) = self.active.lock() {
            *active = Some(url.to_string());
        }
    }
}

#[async_trait]
impl TabNotifier for LogTabs {
    async fn active_url(&self) -> Option<String> {
        self.active.lock().ok().and_then(|active| active.clone())
    }

    async fn can_access_active_tab(&self) -> bool {
        self.active_url()
            .await
            .is_some_and(|url| !sites::is_protected(&url))
    }

    async fn notify_all(&self) -> ExtensionResult<()> {
        log::info!("[Tabs] Asking documents to refresh their theme");
        Ok(())
    }
}

pub struct LogWindowTheme;

#[async_trait]
impl WindowTheme for LogWindowTheme {
    async fn apply(&self, theme: &Theme) -> ExtensionResult<()> {
        log::info!(
            "[Window] Applying theme (bg {}, text {})",
            theme.dark_scheme_background_color,
            theme.dark_scheme_text_color
        );
        Ok(())
    }

    async fn reset(&self) -> ExtensionResult<()> {
        log::info!("[Window] Resetting theme");
        Ok(())
    }
}

pub struct LogIcon;

impl IconController for LogIcon {
    fn set_active(&self) {
        log::info!("[Icon] active");
    }

    fn set_inactive(&self) {
        log::info!("[Icon] inactive");
    }

    fn show_important_badge(&self) {
        log::info!("[Icon] important news badge shown");
    }

    fn hide_badge(&self) {
        log::debug!("[Icon] badge hidden");
    }
}

/// News feed without a network source
#[derive(Default)]
pub struct MemoryNews {
    subscribed: Mutex<bool>,
    items: Mutex<Vec<NewsItem>>,
}

impl MemoryNews {
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.lock().map(|s| *s).unwrap_or(false)
    }

    pub fn publish(&self, items: Vec<NewsItem>) {
        if let Ok(mut current) = self.items.lock() {
            *current = items;
        }
    }
}

#[async_trait]
impl NewsFeed for MemoryNews {
    async fn subscribe(&self) {
        log::info!("[News] subscribed");
        if let Ok(mut subscribed) = self.subscribed.lock() {
            *subscribed = true;
        }
    }

    async fn unsubscribe(&self) {
        log::info!("[News] unsubscribed");
        if let Ok(mut subscribed) = self.subscribed.lock() {
            *subscribed = false;
        }
    }

    async fn latest(&self) -> Vec<NewsItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }
}

pub struct GrantAll;

#[async_trait]
impl Permissions for GrantAll {
    async fn has(&self, _capability: Capability) -> bool {
        true
    }
}

pub struct LogContextMenus;

#[async_trait]
impl ContextMenus for LogContextMenus {
    async fn create_entries(&self) -> ExtensionResult<()> {
        log::info!("[Menus] entries created");
        Ok(())
    }

    async fn remove_all(&self) -> ExtensionResult<()> {
        log::info!("[Menus] entries removed");
        Ok(())
    }
}

pub struct MemoryShortcuts {
    bindings: Mutex<BTreeMap<String, String>>,
}

impl Default for MemoryShortcuts {
    fn default() -> Self {
        let bindings = [
            ("toggle", "Alt+Shift+D"),
            ("addSite", "Alt+Shift+A"),
            ("switchEngine", ""),
        ]
        .into_iter()
        .map(|(command, binding)| (command.to_string(), binding.to_string()))
        .collect();
        Self {
            bindings: Mutex::new(bindings),
        }
    }
}

#[async_trait]
impl Shortcuts for MemoryShortcuts {
    async fn all(&self) -> BTreeMap<String, String> {
        self.bindings.lock().map(|b| b.clone()).unwrap_or_default()
    }

    async fn set(&self, command: &str, binding: &str) -> ExtensionResult<bool> {
        let mut bindings = match self.bindings.lock() {
            Ok(bindings) => bindings,
            Err(_) => return Ok(false),
        };
        bindings.insert(command.to_string(), binding.to_string());
        Ok(true)
    }
}

pub struct LogObserver;

#[async_trait]
impl UiObserver for LogObserver {
    async fn report(&self, data: &ExtensionData) {
        log::debug!(
            "[UI] enabled={} ready={} engine={}",
            data.is_enabled,
            data.is_ready,
            data.settings.theme.engine
        );
    }
}

/// Site config holding only a dark list
pub struct StaticSiteConfig {
    dark_sites: Vec<String>,
}

impl StaticSiteConfig {
    pub fn new(dark_sites: Vec<String>) -> Self {
        Self { dark_sites }
    }
}

impl SiteConfig for StaticSiteConfig {
    fn is_in_dark_list(&self, url: &str) -> bool {
        sites::is_url_in_list(url, &self.dark_sites)
    }

    fn dynamic_fixes(&self, _url: &str, _frame_url: Option<&str>) -> Option<Value> {
        None
    }

    fn inversion_fixes(&self, _url: &str) -> Option<Value> {
        None
    }

    fn static_themes(&self, _url: &str) -> Option<Value> {
        None
    }

    fn color_schemes(&self) -> Value {
        Value::Object(Default::default())
    }

    fn devtools(&self) -> DevtoolsData {
        DevtoolsData::default()
    }
}

/// Minimal stylesheets: a plain filter chain with no per-site fixes
pub struct FilterRenderer;

impl FilterRenderer {
    fn filter_chain(theme: &Theme) -> String {
        format!(
            "invert(100%) hue-rotate(180deg) brightness({}%) contrast({}%) grayscale({}%) sepia({}%)",
            theme.brightness, theme.contrast, theme.grayscale, theme.sepia
        )
    }
}

impl StyleRenderer for FilterRenderer {
    fn css_filter(&self, theme: &Theme, _url: &str, is_top_frame: bool, _fixes: Option<&Value>) -> String {
        if !is_top_frame {
            return String::new();
        }
        format!("html {{ filter: {} !important; }}", Self::filter_chain(theme))
    }

    fn svg_filter(
        &self,
        theme: &Theme,
        url: &str,
        is_top_frame: bool,
        fixes: Option<&Value>,
        encoding: SvgEncoding,
    ) -> String {
        match encoding {
            SvgEncoding::Inline => "html { filter: url(#umbra-filter) !important; }".to_string(),
            SvgEncoding::DataUrl => self.css_filter(theme, url, is_top_frame, fixes),
        }
    }

    fn svg_matrices(&self, theme: &Theme) -> (String, String) {
        let b = theme.brightness as f32 / 100.0;
        (
            format!("-{b} 0 0 0 {b} 0 -{b} 0 0 {b} 0 0 -{b} 0 {b} 0 0 0 1 0"),
            "-1 0 0 0 1 0 -1 0 0 1 0 0 -1 0 1 0 0 0 1 0".to_string(),
        )
    }

    fn static_stylesheet(&self, theme: &Theme, _url: &str, _is_top_frame: bool, _themes: Option<&Value>) -> String {
        format!(
            "html, body {{ background: {} !important; color: {} !important; }}",
            theme.dark_scheme_background_color, theme.dark_scheme_text_color
        )
    }
}
