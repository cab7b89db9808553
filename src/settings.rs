use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExtensionError;

// ============================================================================
// Automation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Automation {
    #[default]
    None,
    Time,
    System,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AutomationBehaviour {
    /// Automation switches the extension on and off
    #[default]
    ToggleOnOff,
    /// Automation flips the theme between dark and light, leaving the extension on
    Scheme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    /// Local clock time ("HH:MM") at which the extension turns on
    pub activation: String,
    /// Local clock time ("HH:MM") at which the extension turns off
    pub deactivation: String,
}

impl Default for TimeSettings {
    fn default() -> Self {
        Self {
            activation: "18:00".to_string(),
            deactivation: "9:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationSettings {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    #[default]
    Dark,
}

impl ThemeMode {
    pub fn from_dark(is_dark: bool) -> Self {
        if is_dark {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }
}

/// Stylesheet generation strategies, in switching order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeEngine {
    CssFilter,
    SvgFilter,
    StaticTheme,
    DynamicTheme,
}

impl ThemeEngine {
    pub const ALL: [ThemeEngine; 4] = [
        ThemeEngine::CssFilter,
        ThemeEngine::SvgFilter,
        ThemeEngine::StaticTheme,
        ThemeEngine::DynamicTheme,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeEngine::CssFilter => "cssFilter",
            ThemeEngine::SvgFilter => "svgFilter",
            ThemeEngine::StaticTheme => "staticTheme",
            ThemeEngine::DynamicTheme => "dynamicTheme",
        }
    }

    /// Next engine in the cycle, wrapping from the last back to the first
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|e| *e == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    /// Engine that follows a raw (possibly unknown) engine name.
    /// Unknown names restart the cycle at the first engine.
    pub fn after(raw: &str) -> Self {
        match raw.parse::<ThemeEngine>() {
            Ok(engine) => engine.next(),
            Err(_) => Self::ALL[0],
        }
    }
}

impl fmt::Display for ThemeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeEngine {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|engine| engine.as_str() == s)
            .ok_or_else(|| ExtensionError::Configuration(format!("unknown theme engine '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub mode: ThemeMode,
    pub brightness: u32,
    pub contrast: u32,
    pub grayscale: u32,
    pub sepia: u32,
    pub use_font: bool,
    pub font_family: String,
    pub text_stroke: f32,
    /// Raw engine name; parsed when a document's descriptor is built
    pub engine: String,
    /// Precomputed stylesheet used verbatim by the static engine when non-empty
    pub stylesheet: String,
    pub dark_scheme_background_color: String,
    pub dark_scheme_text_color: String,
    pub light_scheme_background_color: String,
    pub light_scheme_text_color: String,
    pub scrollbar_color: String,
    pub selection_color: String,
    pub style_system_controls: bool,
    pub immediate_modify: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Dark,
            brightness: 100,
            contrast: 100,
            grayscale: 0,
            sepia: 0,
            use_font: false,
            font_family: "Open Sans".to_string(),
            text_stroke: 0.0,
            engine: ThemeEngine::DynamicTheme.as_str().to_string(),
            stylesheet: String::new(),
            dark_scheme_background_color: "#181a1b".to_string(),
            dark_scheme_text_color: "#e8e6e3".to_string(),
            light_scheme_background_color: "#dcdad7".to_string(),
            light_scheme_text_color: "#181a1b".to_string(),
            scrollbar_color: "auto".to_string(),
            selection_color: "auto".to_string(),
            style_system_controls: true,
            immediate_modify: false,
        }
    }
}

/// Per-site theme override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomSiteConfig {
    pub url: Vec<String>,
    pub theme: Theme,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemePreset {
    pub id: String,
    pub name: String,
    pub urls: Vec<String>,
    pub theme: Theme,
}

// ============================================================================
// User settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    /// Manual switch, used when automation is off
    pub enabled: bool,
    pub fetch_news: bool,
    pub theme: Theme,
    pub presets: Vec<ThemePreset>,
    pub custom_themes: Vec<CustomSiteConfig>,
    /// Sites the extension is turned off for
    pub site_list: Vec<String>,
    /// Dark-listed sites the extension is turned on for anyway
    pub site_list_enabled: Vec<String>,
    /// Treat `site_list` as the only sites to apply to
    pub apply_to_list_only: bool,
    pub change_browser_theme: bool,
    pub sync_settings: bool,
    pub sync_sites_fixes: bool,
    pub automation: Automation,
    pub automation_behaviour: AutomationBehaviour,
    pub time: TimeSettings,
    pub location: LocationSettings,
    #[serde(rename = "enableForPDF")]
    pub enable_for_pdf: bool,
    pub enable_for_protected_pages: bool,
    pub enable_context_menus: bool,
    pub detect_dark_theme: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            fetch_news: true,
            theme: Theme::default(),
            presets: Vec::new(),
            custom_themes: Vec::new(),
            site_list: Vec::new(),
            site_list_enabled: Vec::new(),
            apply_to_list_only: false,
            change_browser_theme: false,
            sync_settings: true,
            sync_sites_fixes: false,
            automation: Automation::None,
            automation_behaviour: AutomationBehaviour::ToggleOnOff,
            time: TimeSettings::default(),
            location: LocationSettings::default(),
            enable_for_pdf: true,
            enable_for_protected_pages: false,
            enable_context_menus: false,
            detect_dark_theme: false,
        }
    }
}

// ============================================================================
// Partial updates
// ============================================================================

/// Copies every `Some` field of a patch over the matching target field.
macro_rules! merge_fields {
    ($patch:expr, $target:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = value.clone();
            }
        )*
    };
}

/// Shallow partial update of [`UserSettings`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub fetch_news: Option<bool>,
    pub theme: Option<Theme>,
    pub presets: Option<Vec<ThemePreset>>,
    pub custom_themes: Option<Vec<CustomSiteConfig>>,
    pub site_list: Option<Vec<String>>,
    pub site_list_enabled: Option<Vec<String>>,
    pub apply_to_list_only: Option<bool>,
    pub change_browser_theme: Option<bool>,
    pub sync_settings: Option<bool>,
    pub sync_sites_fixes: Option<bool>,
    pub automation: Option<Automation>,
    pub automation_behaviour: Option<AutomationBehaviour>,
    pub time: Option<TimeSettings>,
    pub location: Option<LocationSettings>,
    #[serde(rename = "enableForPDF")]
    pub enable_for_pdf: Option<bool>,
    pub enable_for_protected_pages: Option<bool>,
    pub enable_context_menus: Option<bool>,
    pub detect_dark_theme: Option<bool>,
}

impl SettingsPatch {
    pub fn apply_to(&self, settings: &mut UserSettings) {
        merge_fields!(
            self,
            settings,
            [
                enabled,
                fetch_news,
                theme,
                presets,
                custom_themes,
                site_list,
                site_list_enabled,
                apply_to_list_only,
                change_browser_theme,
                sync_settings,
                sync_sites_fixes,
                automation,
                automation_behaviour,
                time,
                location,
                enable_for_pdf,
                enable_for_protected_pages,
                enable_context_menus,
                detect_dark_theme,
            ]
        );
    }
}

/// Partial update of the global [`Theme`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemePatch {
    pub mode: Option<ThemeMode>,
    pub brightness: Option<u32>,
    pub contrast: Option<u32>,
    pub grayscale: Option<u32>,
    pub sepia: Option<u32>,
    pub use_font: Option<bool>,
    pub font_family: Option<String>,
    pub text_stroke: Option<f32>,
    pub engine: Option<String>,
    pub stylesheet: Option<String>,
    pub dark_scheme_background_color: Option<String>,
    pub dark_scheme_text_color: Option<String>,
    pub light_scheme_background_color: Option<String>,
    pub light_scheme_text_color: Option<String>,
    pub scrollbar_color: Option<String>,
    pub selection_color: Option<String>,
    pub style_system_controls: Option<bool>,
    pub immediate_modify: Option<bool>,
}

impl ThemePatch {
    pub fn apply_to(&self, theme: &mut Theme) {
        merge_fields!(
            self,
            theme,
            [
                mode,
                brightness,
                contrast,
                grayscale,
                sepia,
                use_font,
                font_family,
                text_stroke,
                engine,
                stylesheet,
                dark_scheme_background_color,
                dark_scheme_text_color,
                light_scheme_background_color,
                light_scheme_text_color,
                scrollbar_color,
                selection_color,
                style_system_controls,
                immediate_modify,
            ]
        );
    }
}
