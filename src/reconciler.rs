//! Which semantic aspects of the settings changed between two snapshots.

use crate::settings::UserSettings;

/// Each flag selects one side effect. Flags are independent; any number may be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsDiff {
    /// Anything feeding the automation result: rerun the app-toggle path
    pub automation: bool,
    pub sync_settings: bool,
    pub change_browser_theme: bool,
    pub fetch_news: bool,
    pub context_menus: bool,
}

impl SettingsDiff {
    pub fn between(prev: &UserSettings, next: &UserSettings) -> Self {
        Self {
            automation: prev.enabled != next.enabled
                || prev.automation != next.automation
                || prev.automation_behaviour != next.automation_behaviour
                || prev.time.activation != next.time.activation
                || prev.time.deactivation != next.time.deactivation
                || prev.location.latitude != next.location.latitude
                || prev.location.longitude != next.location.longitude,
            sync_settings: prev.sync_settings != next.sync_settings,
            change_browser_theme: prev.change_browser_theme != next.change_browser_theme,
            fetch_news: prev.fetch_news != next.fetch_news,
            context_menus: prev.enable_context_menus != next.enable_context_menus,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
