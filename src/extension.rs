//! The orchestrator: owns settings and state, reconciles changes and
//! answers per-document queries.
//!
//! All reads and writes of settings/state happen under one async lock, so
//! overlapping events (alarm fire, command, settings edit) are serialized and
//! a read-modify-persist sequence can never interleave with another.

use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::{watch, Mutex};

use crate::automation::{self, AutomationOutcome, AUTOMATION_ALARM};
use crate::barrier::StartBarrier;
use crate::collaborators::{Capability, Collaborators, DevtoolsData, NewsItem};
use crate::commands::Command;
use crate::context_menu::ContextMenuRegistrar;
use crate::dispatcher::{self, DispatchContext, TabMessage};
use crate::error::{ExtensionError, ExtensionResult};
use crate::reconciler::SettingsDiff;
use crate::settings::{
    Automation, SettingsPatch, Theme, ThemeEngine, ThemeMode, ThemePatch, UserSettings,
};
use crate::sites;
use crate::state::StateManager;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTabInfo {
    pub url: String,
    pub is_protected: bool,
    #[serde(rename = "isPDF")]
    pub is_pdf: bool,
    pub is_in_dark_list: bool,
    /// Whether the document would be styled right now
    pub is_enabled: bool,
}

/// Aggregate read used to render any UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionData {
    pub is_enabled: bool,
    pub is_ready: bool,
    pub settings: UserSettings,
    pub news: Vec<NewsItem>,
    pub shortcuts: BTreeMap<String, String>,
    pub color_schemes: Value,
    pub devtools: DevtoolsData,
    pub active_tab: Option<ActiveTabInfo>,
}

struct Core {
    settings: Option<UserSettings>,
    state: StateManager,
}

impl Core {
    fn settings(&self) -> ExtensionResult<&UserSettings> {
        self.settings
            .as_ref()
            .ok_or_else(|| ExtensionError::NotReady("settings are not loaded".to_string()))
    }

    fn is_enabled(&self) -> bool {
        self.state.get().is_enabled.unwrap_or(false)
    }
}

/// Last published settings and enabled flag. Document and UI queries read
/// this instead of taking the writer lock, so collaborators called during
/// reconciliation can query back into the extension.
#[derive(Debug, Clone)]
struct DocumentView {
    settings: UserSettings,
    is_enabled: bool,
}

impl DocumentView {
    fn of(core: &Core) -> ExtensionResult<Self> {
        Ok(Self {
            settings: core.settings()?.clone(),
            is_enabled: core.is_enabled(),
        })
    }
}

fn log_effect(effect: &str, result: ExtensionResult<()>) {
    if let Err(e) = result {
        log::error!("Failed to {}: {}", effect, e);
    }
}

pub struct Extension {
    core: Mutex<Core>,
    c: Collaborators,
    barrier: StartBarrier,
    published: watch::Sender<Option<DocumentView>>,
}

impl Extension {
    pub fn new(collaborators: Collaborators) -> Self {
        let state = StateManager::new(collaborators.state_store.clone());
        Self {
            core: Mutex::new(Core {
                settings: None,
                state,
            }),
            c: collaborators,
            barrier: StartBarrier::new(),
            published: watch::channel(None).0,
        }
    }

    pub fn barrier(&self) -> &StartBarrier {
        &self.barrier
    }

    pub fn is_ready(&self) -> bool {
        self.barrier.is_resolved()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Load everything, compute the initial state and open the start barrier
    pub async fn start(&self) -> ExtensionResult<()> {
        log::info!("Starting extension");
        let mut core = self.core.lock().await;
        self.ensure_loaded(&mut core).await?;

        self.recalculate(&mut core);
        let is_enabled = core.state.get().is_enabled;
        core.state.get_mut().was_enabled_on_last_check = is_enabled;
        log_effect("toggle app state", self.on_app_toggle(&core).await);

        let settings = core.settings()?.clone();
        if settings.fetch_news {
            self.c.news.subscribe().await;
        }
        if settings.enable_context_menus {
            self.register_context_menus(&mut core).await;
        }
        core.state.save().await?;

        self.barrier.resolve();
        self.notify_tabs().await;
        self.report_changes(&core).await;
        log::info!("Extension started (enabled: {})", core.is_enabled());
        Ok(())
    }

    async fn ensure_loaded(&self, core: &mut Core) -> ExtensionResult<()> {
        let fresh = core.settings.is_none() || !core.state.is_loaded();
        if core.settings.is_none() {
            core.settings = Some(self.c.settings_store.load().await?);
            log::debug!("Settings loaded");
        }
        core.state.load().await?;
        if fresh {
            self.publish(core);
        }
        Ok(())
    }

    fn publish(&self, core: &Core) {
        match DocumentView::of(core) {
            Ok(view) => {
                self.published.send_replace(Some(view));
            }
            Err(e) => log::debug!("Nothing to publish yet: {}", e),
        }
    }

    /// The published view, loading (under the lock) only if nothing was published yet
    async fn published_view(&self) -> ExtensionResult<DocumentView> {
        let published = self.published.borrow().clone();
        if let Some(view) = published {
            return Ok(view);
        }
        let mut core = self.core.lock().await;
        self.ensure_loaded(&mut core).await?;
        DocumentView::of(&core)
    }

    // ========================================================================
    // Automation
    // ========================================================================

    /// Evaluate automation, store the result and (re)arm the check alarm.
    ///
    /// Without loaded settings this makes no decision and reports disabled.
    fn recalculate(&self, core: &mut Core) -> AutomationOutcome {
        let Some(settings) = core.settings.as_ref() else {
            log::warn!("Automation evaluated before settings were loaded, reporting disabled");
            return AutomationOutcome {
                is_enabled: Some(false),
                ..Default::default()
            };
        };

        let now = self.c.clock.now().with_timezone(&Local);
        let outcome = automation::evaluate(settings, &now, || self.c.color_scheme.is_dark());
        log::debug!("Automation {:?} -> {:?}", settings.automation, outcome);

        if let Some(is_enabled) = outcome.is_enabled {
            core.state.get_mut().is_enabled = Some(is_enabled);
            self.publish(core);
        }
        match outcome.next_check {
            Some(at) => self.c.alarms.arm_once(AUTOMATION_ALARM, at),
            None => self.c.alarms.cancel(AUTOMATION_ALARM),
        }
        outcome
    }

    pub async fn recalculate_is_enabled(&self) -> bool {
        let mut core = self.core.lock().await;
        if let Err(e) = self.ensure_loaded(&mut core).await {
            log::warn!("Recalculating without loaded settings: {}", e);
        }
        let outcome = self.recalculate(&mut core);
        if core.settings.is_none() {
            return outcome.is_enabled.unwrap_or(false);
        }
        core.is_enabled()
    }

    /// Timer or appearance-change driven check; acts only on an edge
    pub async fn handle_automation_check(&self) -> ExtensionResult<()> {
        let mut core = self.core.lock().await;
        self.ensure_loaded(&mut core).await?;

        let outcome = self.recalculate(&mut core);
        if let Some(mode) = outcome.scheme {
            if core.settings()?.theme.mode != mode {
                log::info!("System appearance changed, switching theme mode to {:?}", mode);
                let patch = ThemePatch {
                    mode: Some(mode),
                    ..Default::default()
                };
                return self.set_theme_locked(&mut core, patch).await;
            }
            return Ok(());
        }

        let state = *core.state.get();
        let Some(is_enabled) = state.is_enabled else {
            return Ok(());
        };
        if state.was_enabled_on_last_check == Some(is_enabled) {
            log::debug!("Automation check: still {}", if is_enabled { "on" } else { "off" });
            return Ok(());
        }

        log::info!("Automation switched extension {}", if is_enabled { "on" } else { "off" });
        core.state.get_mut().was_enabled_on_last_check = Some(is_enabled);
        log_effect("toggle app state", self.on_app_toggle(&core).await);
        self.notify_tabs().await;
        self.report_changes(&core).await;
        core.state.save().await
    }

    pub async fn on_alarm(&self, name: &str) -> ExtensionResult<()> {
        if name != AUTOMATION_ALARM {
            log::debug!("Ignoring unknown alarm '{}'", name);
            return Ok(());
        }
        self.handle_automation_check().await
    }

    /// Live system appearance notification
    pub async fn on_color_scheme_change(&self, is_dark: bool) -> ExtensionResult<()> {
        self.c.color_scheme.observe(is_dark);
        let automation = {
            let mut core = self.core.lock().await;
            self.ensure_loaded(&mut core).await?;
            core.settings()?.automation
        };
        if automation == Automation::System {
            return self.handle_automation_check().await;
        }
        Ok(())
    }

    // ========================================================================
    // Effects
    // ========================================================================

    async fn on_app_toggle(&self, core: &Core) -> ExtensionResult<()> {
        let settings = core.settings()?;
        let is_enabled = core.is_enabled();
        if is_enabled {
            self.c.icon.set_active();
        } else {
            self.c.icon.set_inactive();
        }
        if settings.change_browser_theme {
            self.sync_window_theme(is_enabled, &settings.theme).await?;
        }
        Ok(())
    }

    async fn sync_window_theme(&self, apply: bool, theme: &Theme) -> ExtensionResult<()> {
        if apply {
            self.c.window_theme.apply(theme).await
        } else {
            self.c.window_theme.reset().await
        }
    }

    async fn notify_tabs(&self) {
        if let Err(e) = self.c.tabs.notify_all().await {
            log::error!("Failed to notify tabs: {}", e);
        }
    }

    async fn register_context_menus(&self, core: &mut Core) {
        let registrar = ContextMenuRegistrar {
            menus: self.c.context_menus.as_ref(),
            permissions: self.c.permissions.as_ref(),
        };
        match registrar.register(core.state.get_mut()).await {
            Ok(()) => {}
            Err(ExtensionError::PermissionDenied(reason)) => {
                log::warn!("Context menus not registered: {}", reason)
            }
            Err(e) => log::error!("Failed to register context menus: {}", e),
        }
    }

    async fn unregister_context_menus(&self, core: &mut Core) {
        let registrar = ContextMenuRegistrar {
            menus: self.c.context_menus.as_ref(),
            permissions: self.c.permissions.as_ref(),
        };
        log_effect(
            "remove context menus",
            registrar.unregister(core.state.get_mut()).await,
        );
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub async fn change_settings(&self, patch: SettingsPatch) -> ExtensionResult<()> {
        let mut core = self.core.lock().await;
        self.change_settings_locked(&mut core, patch).await
    }

    async fn change_settings_locked(&self, core: &mut Core, patch: SettingsPatch) -> ExtensionResult<()> {
        self.ensure_loaded(core).await?;
        let prev = core.settings()?.clone();
        if let Some(settings) = core.settings.as_mut() {
            patch.apply_to(settings);
        }
        self.publish(core);
        let next = core.settings()?.clone();
        let diff = SettingsDiff::between(&prev, &next);
        log::debug!("Settings diff: {:?}", diff);

        if diff.automation {
            let outcome = self.recalculate(core);
            log_effect("toggle app state", self.on_app_toggle(core).await);
            if let Some(mode) = outcome.scheme {
                self.align_theme_mode(core, mode).await;
            }
        }
        if diff.sync_settings {
            log_effect(
                "save sync preference",
                self.c.settings_store.save_sync_flag(next.sync_settings).await,
            );
        }
        if diff.change_browser_theme && core.is_enabled() {
            log_effect(
                "update window theme",
                self.sync_window_theme(next.change_browser_theme, &next.theme)
                    .await,
            );
        }
        if diff.fetch_news {
            if next.fetch_news {
                self.c.news.subscribe().await;
            } else {
                self.c.news.unsubscribe().await;
            }
        }
        if diff.context_menus {
            if next.enable_context_menus {
                self.register_context_menus(core).await;
            } else {
                self.unregister_context_menus(core).await;
            }
        }

        self.on_settings_changed(core).await
    }

    /// Bring `theme.mode` in line with the system appearance when switching to `Scheme`
    async fn align_theme_mode(&self, core: &mut Core, mode: ThemeMode) {
        let is_enabled = core.is_enabled();
        let Some(settings) = core.settings.as_mut() else {
            return;
        };
        if settings.theme.mode == mode {
            return;
        }
        log::info!("Aligning theme mode with system appearance: {:?}", mode);
        settings.theme.mode = mode;
        let theme = settings.theme.clone();
        let apply_window = settings.change_browser_theme && is_enabled;
        self.publish(core);
        if apply_window {
            log_effect("apply window theme", self.c.window_theme.apply(&theme).await);
        }
    }

    /// Runs after every settings mutation, whatever changed
    async fn on_settings_changed(&self, core: &mut Core) -> ExtensionResult<()> {
        self.ensure_loaded(core).await?;
        let is_enabled = core.state.get().is_enabled;
        core.state.get_mut().was_enabled_on_last_check = is_enabled;
        self.notify_tabs().await;
        self.c.settings_store.save(core.settings()?).await?;
        self.report_changes(core).await;
        core.state.save().await
    }

    pub async fn set_theme(&self, patch: ThemePatch) -> ExtensionResult<()> {
        let mut core = self.core.lock().await;
        self.set_theme_locked(&mut core, patch).await
    }

    async fn set_theme_locked(&self, core: &mut Core, patch: ThemePatch) -> ExtensionResult<()> {
        self.ensure_loaded(core).await?;
        let settings = core.settings()?;
        let mut theme = settings.theme.clone();
        patch.apply_to(&mut theme);

        if core.is_enabled() && settings.change_browser_theme {
            log_effect("apply window theme", self.c.window_theme.apply(&theme).await);
        }
        let patch = SettingsPatch {
            theme: Some(theme),
            ..Default::default()
        };
        self.change_settings_locked(core, patch).await
    }

    // ========================================================================
    // Sites
    // ========================================================================

    /// Add or remove the URL's site from exactly one list: the dark-list
    /// exceptions if the site is dark by default, the ordinary list otherwise.
    pub async fn toggle_url(&self, url: &str) -> ExtensionResult<()> {
        let mut core = self.core.lock().await;
        self.toggle_url_locked(&mut core, url).await
    }

    async fn toggle_url_locked(&self, core: &mut Core, url: &str) -> ExtensionResult<()> {
        self.ensure_loaded(core).await?;
        let settings = core.settings()?;
        let pattern = sites::host_or_protocol(url);

        let patch = if self.c.site_config.is_in_dark_list(url) {
            log::info!("Toggling '{}' in dark list exceptions", pattern);
            SettingsPatch {
                site_list_enabled: Some(sites::toggle_pattern(&settings.site_list_enabled, &pattern)),
                ..Default::default()
            }
        } else {
            log::info!("Toggling '{}' in site list", pattern);
            SettingsPatch {
                site_list: Some(sites::toggle_pattern(&settings.site_list, &pattern)),
                ..Default::default()
            }
        };
        self.change_settings_locked(core, patch).await
    }

    pub async fn toggle_current_site(&self) -> ExtensionResult<()> {
        let url = self.active_url().await?;
        self.toggle_url(&url).await
    }

    async fn active_url(&self) -> ExtensionResult<String> {
        if !self.c.tabs.can_access_active_tab().await {
            return Err(ExtensionError::PermissionDenied(
                "active tab is not accessible".to_string(),
            ));
        }
        self.c
            .tabs
            .active_url()
            .await
            .ok_or_else(|| ExtensionError::Collaborator("no active tab".to_string()))
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Run one command, waiting for startup to finish first
    pub async fn handle_command(&self, command: Command, arg: Option<String>) -> ExtensionResult<()> {
        self.barrier.wait().await;
        log::info!("Handling command {} ({:?})", command, arg);

        let mut core = self.core.lock().await;
        self.ensure_loaded(&mut core).await?;

        match command {
            Command::Toggle => {
                let patch = SettingsPatch {
                    enabled: Some(!core.is_enabled()),
                    automation: Some(Automation::None),
                    ..Default::default()
                };
                self.change_settings_locked(&mut core, patch).await
            }
            Command::AddSite => {
                let url = match arg {
                    Some(url) => url,
                    None => self.active_url().await?,
                };
                if sites::is_pdf(&url) {
                    let patch = SettingsPatch {
                        enable_for_pdf: Some(!core.settings()?.enable_for_pdf),
                        ..Default::default()
                    };
                    self.change_settings_locked(&mut core, patch).await
                } else {
                    self.toggle_url_locked(&mut core, &url).await
                }
            }
            Command::SwitchEngine => {
                let engine = ThemeEngine::after(&core.settings()?.theme.engine);
                log::info!("Switching engine to {}", engine);
                let patch = ThemePatch {
                    engine: Some(engine.as_str().to_string()),
                    ..Default::default()
                };
                self.set_theme_locked(&mut core, patch).await
            }
        }
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Descriptor for one document (top frame when `frame_url` is `None`)
    pub async fn resolve_tab_message(&self, url: &str, frame_url: Option<&str>) -> ExtensionResult<TabMessage> {
        let view = self.published_view().await?;

        let ctx = DispatchContext {
            settings: &view.settings,
            is_enabled: view.is_enabled,
            site_config: self.c.site_config.as_ref(),
            renderer: self.c.renderer.as_ref(),
            svg_encoding: self.c.svg_encoding,
        };
        dispatcher::resolve(&ctx, url, frame_url).inspect_err(|e| {
            log::error!("Failed to build message for {}: {}", url, e);
        })
    }

    // ========================================================================
    // UI
    // ========================================================================

    pub async fn collect_snapshot(&self) -> ExtensionResult<ExtensionData> {
        let view = self.published_view().await?;
        Ok(self.snapshot(view).await)
    }

    async fn snapshot(&self, view: DocumentView) -> ExtensionData {
        let DocumentView {
            settings,
            is_enabled,
        } = view;

        let active_tab = match self.c.tabs.active_url().await {
            Some(url) => {
                let is_in_dark_list = self.c.site_config.is_in_dark_list(&url);
                Some(ActiveTabInfo {
                    is_protected: sites::is_protected(&url),
                    is_pdf: sites::is_pdf(&url),
                    is_in_dark_list,
                    is_enabled: sites::is_url_enabled(&url, &settings, is_in_dark_list),
                    url,
                })
            }
            None => None,
        };

        ExtensionData {
            is_enabled,
            is_ready: self.barrier.is_resolved(),
            news: self.c.news.latest().await,
            shortcuts: self.c.shortcuts.all().await,
            color_schemes: self.c.site_config.color_schemes(),
            devtools: self.c.site_config.devtools(),
            active_tab,
            settings,
        }
    }

    async fn report_changes(&self, core: &Core) {
        match DocumentView::of(core) {
            Ok(view) => self.report_view(view).await,
            Err(e) => log::warn!("Skipping UI report: {}", e),
        }
    }

    async fn report_view(&self, view: DocumentView) {
        let data = self.snapshot(view).await;
        self.c.observer.report(&data).await;
    }

    pub async fn set_shortcut(&self, command: &str, binding: &str) -> ExtensionResult<bool> {
        let command: Command = command.parse()?;
        let updated = self.c.shortcuts.set(command.as_str(), binding).await?;
        self.report_view(self.published_view().await?).await;
        Ok(updated)
    }

    /// Badge reflects the newest item: shown while it is important and unread
    pub async fn on_news_updated(&self, news: &[NewsItem]) {
        match news.first() {
            Some(latest) if latest.important && !latest.read => self.c.icon.show_important_badge(),
            _ => self.c.icon.hide_badge(),
        }
        match self.published_view().await {
            Ok(view) => self.report_view(view).await,
            Err(e) => log::warn!("Skipping UI report: {}", e),
        }
    }

    pub async fn on_permission_revoked(&self, capability: Capability) -> ExtensionResult<()> {
        match capability {
            Capability::ContextMenus => {
                let mut core = self.core.lock().await;
                core.state.load().await?;
                log::info!("Context menus permission revoked");
                core.state.get_mut().registered_context_menus = Some(false);
                core.state.save().await
            }
        }
    }
}
