//! Per-document theme resolution.
//!
//! Picks the theme that applies to a URL and builds the descriptor the
//! document receives for that theme's engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborators::{SiteConfig, StyleRenderer};
use crate::error::ExtensionResult;
use crate::settings::{Theme, ThemeEngine, UserSettings};
use crate::sites;

/// How the SVG filter engine hands its filter to the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvgEncoding {
    /// Filter matrices are sent separately and injected inline
    #[default]
    Inline,
    /// The whole filter is embedded in the stylesheet as a data URL
    DataUrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum TabMessage {
    CleanUp,
    #[serde(rename_all = "camelCase")]
    AddCssFilter { css: String, detect_dark_theme: bool },
    #[serde(rename_all = "camelCase")]
    AddSvgFilter {
        css: String,
        svg_matrix: Option<String>,
        svg_reverse_matrix: Option<String>,
        detect_dark_theme: bool,
    },
    #[serde(rename_all = "camelCase")]
    AddStaticTheme { css: String, detect_dark_theme: bool },
    #[serde(rename_all = "camelCase")]
    AddDynamicTheme {
        theme: Theme,
        fixes: Option<Value>,
        is_iframe: bool,
        detect_dark_theme: bool,
    },
}

/// Where the selected theme came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeSource {
    Custom,
    Preset,
    Global,
}

/// First match wins: custom site theme, then preset, then the global theme
pub fn select_theme<'a>(url: &str, settings: &'a UserSettings) -> (&'a Theme, ThemeSource) {
    if let Some(custom) = settings
        .custom_themes
        .iter()
        .find(|custom| sites::is_url_in_list(url, &custom.url))
    {
        return (&custom.theme, ThemeSource::Custom);
    }
    if let Some(preset) = settings
        .presets
        .iter()
        .find(|preset| sites::is_url_in_list(url, &preset.urls))
    {
        return (&preset.theme, ThemeSource::Preset);
    }
    (&settings.theme, ThemeSource::Global)
}

pub struct DispatchContext<'a> {
    pub settings: &'a UserSettings,
    pub is_enabled: bool,
    pub site_config: &'a dyn SiteConfig,
    pub renderer: &'a dyn StyleRenderer,
    pub svg_encoding: SvgEncoding,
}

/// Build the descriptor for one document.
///
/// An unknown engine on the selected theme fails only this document.
pub fn resolve(ctx: &DispatchContext<'_>, url: &str, frame_url: Option<&str>) -> ExtensionResult<TabMessage> {
    let is_in_dark_list = ctx.site_config.is_in_dark_list(url);
    if !ctx.is_enabled || !sites::is_url_enabled(url, ctx.settings, is_in_dark_list) {
        log::debug!("Clean up for {}", url);
        return Ok(TabMessage::CleanUp);
    }

    let (theme, source) = select_theme(url, ctx.settings);
    let engine: ThemeEngine = theme.engine.parse()?;
    let is_top_frame = frame_url.is_none();
    let detect_dark_theme = is_top_frame && ctx.settings.detect_dark_theme;
    log::debug!("Resolving {} with {:?} theme, engine {}", url, source, engine);

    let message = match engine {
        ThemeEngine::CssFilter => {
            let fixes = ctx.site_config.inversion_fixes(url);
            TabMessage::AddCssFilter {
                css: ctx.renderer.css_filter(theme, url, is_top_frame, fixes.as_ref()),
                detect_dark_theme,
            }
        }
        ThemeEngine::SvgFilter => {
            let fixes = ctx.site_config.inversion_fixes(url);
            let css = ctx.renderer.svg_filter(
                theme,
                url,
                is_top_frame,
                fixes.as_ref(),
                ctx.svg_encoding,
            );
            let (svg_matrix, svg_reverse_matrix) = match ctx.svg_encoding {
                SvgEncoding::Inline => {
                    let (matrix, reverse) = ctx.renderer.svg_matrices(theme);
                    (Some(matrix), Some(reverse))
                }
                SvgEncoding::DataUrl => (None, None),
            };
            TabMessage::AddSvgFilter {
                css,
                svg_matrix,
                svg_reverse_matrix,
                detect_dark_theme,
            }
        }
        ThemeEngine::StaticTheme => {
            let css = if theme.stylesheet.trim().is_empty() {
                let themes = ctx.site_config.static_themes(url);
                ctx.renderer
                    .static_stylesheet(theme, url, is_top_frame, themes.as_ref())
            } else {
                theme.stylesheet.clone()
            };
            TabMessage::AddStaticTheme {
                css,
                detect_dark_theme,
            }
        }
        ThemeEngine::DynamicTheme => TabMessage::AddDynamicTheme {
            theme: theme.clone(),
            fixes: ctx.site_config.dynamic_fixes(url, frame_url),
            is_iframe: !is_top_frame,
            detect_dark_theme,
        },
    };

    Ok(message)
}
