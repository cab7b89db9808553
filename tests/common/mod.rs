#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use umbra::collaborators::{
    AlarmScheduler, Capability, Clock, Collaborators, ContextMenus, DevtoolsData, IconController,
    NewsFeed, NewsItem, Permissions, SettingsStore, Shortcuts, SiteConfig, StateStore,
    StyleRenderer, TabNotifier, UiObserver, WindowTheme,
};
use umbra::sites;
use umbra::theme::StaticProbe;
use umbra::{
    Extension, ExtensionData, ExtensionError, ExtensionResult, ExtensionState, SvgEncoding,
    SystemColorScheme, TabMessage, Theme, UserSettings,
};

// ============================================================================
// Stores
// ============================================================================

#[derive(Default)]
pub struct FakeSettingsStore {
    pub settings: Mutex<UserSettings>,
    pub saves: AtomicUsize,
    pub sync_flags: Mutex<Vec<bool>>,
    pub fail_load: AtomicBool,
}

impl FakeSettingsStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> UserSettings {
        self.settings.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettingsStore for FakeSettingsStore {
    async fn load(&self) -> ExtensionResult<UserSettings> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(ExtensionError::Storage("settings unavailable".to_string()));
        }
        Ok(self.current())
    }

    async fn save(&self, settings: &UserSettings) -> ExtensionResult<()> {
        *self.settings.lock().unwrap() = settings.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_sync_flag(&self, sync: bool) -> ExtensionResult<()> {
        self.sync_flags.lock().unwrap().push(sync);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStateStore {
    pub state: Mutex<ExtensionState>,
    pub saves: AtomicUsize,
}

impl FakeStateStore {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> ExtensionState {
        *self.state.lock().unwrap()
    }
}

#[async_trait]
impl StateStore for FakeStateStore {
    async fn load(&self) -> ExtensionResult<ExtensionState> {
        Ok(self.current())
    }

    async fn save(&self, state: &ExtensionState) -> ExtensionResult<()> {
        *self.state.lock().unwrap() = *state;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Host surfaces
// ============================================================================

/// When connected to an extension, `notify_all` re-requests the active
/// document's descriptor like a live tab would.
pub struct FakeTabs {
    pub active: Mutex<Option<String>>,
    pub accessible: AtomicBool,
    pub notifications: AtomicUsize,
    pub extension: OnceLock<Weak<Extension>>,
    pub resolved: Mutex<Vec<TabMessage>>,
}

impl Default for FakeTabs {
    fn default() -> Self {
        Self {
            active: Mutex::new(None),
            accessible: AtomicBool::new(true),
            notifications: AtomicUsize::new(0),
            extension: OnceLock::new(),
            resolved: Mutex::new(Vec::new()),
        }
    }
}

impl FakeTabs {
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn open(&self, url: &str) {
        *self.active.lock().unwrap() = Some(url.to_string());
    }

    pub fn connect(&self, extension: &Arc<Extension>) {
        let _ = self.extension.set(Arc::downgrade(extension));
    }

    pub fn resolved(&self) -> Vec<TabMessage> {
        self.resolved.lock().unwrap().clone()
    }
}

#[async_trait]
impl TabNotifier for FakeTabs {
    async fn active_url(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    async fn can_access_active_tab(&self) -> bool {
        self.accessible.load(Ordering::SeqCst)
    }

    async fn notify_all(&self) -> ExtensionResult<()> {
        self.notifications.fetch_add(1, Ordering::SeqCst);
        let extension = self.extension.get().and_then(Weak::upgrade);
        let url = self.active.lock().unwrap().clone();
        if let (Some(extension), Some(url)) = (extension, url) {
            let message = extension.resolve_tab_message(&url, None).await?;
            self.resolved.lock().unwrap().push(message);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeWindowTheme {
    pub events: Mutex<Vec<&'static str>>,
}

impl FakeWindowTheme {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl WindowTheme for FakeWindowTheme {
    async fn apply(&self, _theme: &Theme) -> ExtensionResult<()> {
        self.events.lock().unwrap().push("apply");
        Ok(())
    }

    async fn reset(&self) -> ExtensionResult<()> {
        self.events.lock().unwrap().push("reset");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeIcon {
    pub events: Mutex<Vec<&'static str>>,
}

impl FakeIcon {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<&'static str> {
        self.events.lock().unwrap().last().copied()
    }
}

impl IconController for FakeIcon {
    fn set_active(&self) {
        self.events.lock().unwrap().push("active");
    }

    fn set_inactive(&self) {
        self.events.lock().unwrap().push("inactive");
    }

    fn show_important_badge(&self) {
        self.events.lock().unwrap().push("badge");
    }

    fn hide_badge(&self) {
        self.events.lock().unwrap().push("no-badge");
    }
}

#[derive(Default)]
pub struct FakeNews {
    pub events: Mutex<Vec<&'static str>>,
    pub items: Mutex<Vec<NewsItem>>,
}

impl FakeNews {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsFeed for FakeNews {
    async fn subscribe(&self) {
        self.events.lock().unwrap().push("subscribe");
    }

    async fn unsubscribe(&self) {
        self.events.lock().unwrap().push("unsubscribe");
    }

    async fn latest(&self) -> Vec<NewsItem> {
        self.items.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeAlarms {
    pub armed: Mutex<Vec<(String, DateTime<Utc>)>>,
    pub cancelled: AtomicUsize,
}

impl FakeAlarms {
    pub fn armed(&self) -> Vec<(String, DateTime<Utc>)> {
        self.armed.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl AlarmScheduler for FakeAlarms {
    fn arm_once(&self, name: &str, when: DateTime<Utc>) {
        self.armed.lock().unwrap().push((name.to_string(), when));
    }

    fn cancel(&self, _name: &str) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct FakePermissions {
    pub granted: AtomicBool,
}

#[async_trait]
impl Permissions for FakePermissions {
    async fn has(&self, _capability: Capability) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeMenus {
    pub created: AtomicUsize,
    pub removed: AtomicUsize,
}

impl FakeMenus {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextMenus for FakeMenus {
    async fn create_entries(&self) -> ExtensionResult<()> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_all(&self) -> ExtensionResult<()> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeShortcuts {
    pub bindings: Mutex<BTreeMap<String, String>>,
}

#[async_trait]
impl Shortcuts for FakeShortcuts {
    async fn all(&self) -> BTreeMap<String, String> {
        self.bindings.lock().unwrap().clone()
    }

    async fn set(&self, command: &str, binding: &str) -> ExtensionResult<bool> {
        self.bindings
            .lock()
            .unwrap()
            .insert(command.to_string(), binding.to_string());
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeObserver {
    pub reports: Mutex<Vec<ExtensionData>>,
}

impl FakeObserver {
    pub fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<ExtensionData> {
        self.reports.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl UiObserver for FakeObserver {
    async fn report(&self, data: &ExtensionData) {
        self.reports.lock().unwrap().push(data.clone());
    }
}

// ============================================================================
// Config & rendering
// ============================================================================

pub struct FakeSiteConfig {
    pub dark_sites: Vec<String>,
}

impl SiteConfig for FakeSiteConfig {
    fn is_in_dark_list(&self, url: &str) -> bool {
        sites::is_url_in_list(url, &self.dark_sites)
    }

    fn dynamic_fixes(&self, url: &str, frame_url: Option<&str>) -> Option<Value> {
        Some(json!({ "url": frame_url.unwrap_or(url) }))
    }

    fn inversion_fixes(&self, _url: &str) -> Option<Value> {
        Some(json!({ "invert": ["img"] }))
    }

    fn static_themes(&self, _url: &str) -> Option<Value> {
        None
    }

    fn color_schemes(&self) -> Value {
        json!({ "dark": { "Default": {} } })
    }

    fn devtools(&self) -> DevtoolsData {
        DevtoolsData {
            dynamic_fixes_text: "*\n\nINVERT\nimg".to_string(),
            ..Default::default()
        }
    }
}

pub struct FakeRenderer;

impl StyleRenderer for FakeRenderer {
    fn css_filter(&self, theme: &Theme, _url: &str, _is_top_frame: bool, fixes: Option<&Value>) -> String {
        format!("css-filter:{}:{}", theme.brightness, fixes.is_some())
    }

    fn svg_filter(
        &self,
        theme: &Theme,
        _url: &str,
        _is_top_frame: bool,
        _fixes: Option<&Value>,
        encoding: SvgEncoding,
    ) -> String {
        format!("svg-filter:{}:{:?}", theme.brightness, encoding)
    }

    fn svg_matrices(&self, _theme: &Theme) -> (String, String) {
        ("matrix".to_string(), "reverse".to_string())
    }

    fn static_stylesheet(&self, theme: &Theme, _url: &str, _is_top_frame: bool, _themes: Option<&Value>) -> String {
        format!("generated:{}", theme.brightness)
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct HarnessOptions {
    pub settings: UserSettings,
    pub state: ExtensionState,
    pub dark_sites: Vec<String>,
    pub now: DateTime<Utc>,
    pub system_dark: Option<bool>,
    pub svg_encoding: SvgEncoding,
    pub permission_granted: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            settings: UserSettings::default(),
            state: ExtensionState::default(),
            dark_sites: Vec::new(),
            now: Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap(),
            system_dark: Some(false),
            svg_encoding: SvgEncoding::Inline,
            permission_granted: true,
        }
    }
}

pub struct Harness {
    pub extension: Arc<Extension>,
    pub settings_store: Arc<FakeSettingsStore>,
    pub state_store: Arc<FakeStateStore>,
    pub tabs: Arc<FakeTabs>,
    pub window_theme: Arc<FakeWindowTheme>,
    pub icon: Arc<FakeIcon>,
    pub news: Arc<FakeNews>,
    pub alarms: Arc<FakeAlarms>,
    pub permissions: Arc<FakePermissions>,
    pub menus: Arc<FakeMenus>,
    pub shortcuts: Arc<FakeShortcuts>,
    pub observer: Arc<FakeObserver>,
}

impl Harness {
    pub fn new(settings: UserSettings) -> Self {
        Self::with(HarnessOptions {
            settings,
            ..Default::default()
        })
    }

    pub fn with(options: HarnessOptions) -> Self {
        let settings_store = Arc::new(FakeSettingsStore {
            settings: Mutex::new(options.settings),
            ..Default::default()
        });
        let state_store = Arc::new(FakeStateStore {
            state: Mutex::new(options.state),
            ..Default::default()
        });
        let tabs = Arc::new(FakeTabs::default());
        let window_theme = Arc::new(FakeWindowTheme::default());
        let icon = Arc::new(FakeIcon::default());
        let news = Arc::new(FakeNews::default());
        let alarms = Arc::new(FakeAlarms::default());
        let permissions = Arc::new(FakePermissions {
            granted: AtomicBool::new(options.permission_granted),
        });
        let menus = Arc::new(FakeMenus::default());
        let shortcuts = Arc::new(FakeShortcuts::default());
        let observer = Arc::new(FakeObserver::default());

        let collaborators = Collaborators {
            settings_store: settings_store.clone(),
            state_store: state_store.clone(),
            tabs: tabs.clone(),
            window_theme: window_theme.clone(),
            icon: icon.clone(),
            news: news.clone(),
            alarms: alarms.clone(),
            permissions: permissions.clone(),
            context_menus: menus.clone(),
            shortcuts: shortcuts.clone(),
            observer: observer.clone(),
            site_config: Arc::new(FakeSiteConfig {
                dark_sites: options.dark_sites,
            }),
            renderer: Arc::new(FakeRenderer),
            color_scheme: SystemColorScheme::new(Box::new(StaticProbe(options.system_dark))),
            clock: Arc::new(FixedClock(options.now)),
            svg_encoding: options.svg_encoding,
        };

        Self {
            extension: Arc::new(Extension::new(collaborators)),
            settings_store,
            state_store,
            tabs,
            window_theme,
            icon,
            news,
            alarms,
            permissions,
            menus,
            shortcuts,
            observer,
        }
    }

    pub async fn started(self) -> Self {
        self.extension.start().await.unwrap();
        self
    }
}
