//! System appearance (dark/light) detection for `system` automation.
//!
//! The static query is not trusted forever: some hosts report a stale value
//! right after a cold background start, so the last value delivered by a live
//! change notification always wins once one has been observed.

#![allow(unexpected_cfgs)]

use std::sync::Mutex;

/// Strategy for reading the host's current color scheme
pub trait ColorSchemeProbe: Send + Sync {
    /// `Some(true)` for dark, `Some(false)` for light, `None` if unknown
    fn query_dark(&self) -> Option<bool>;

    fn name(&self) -> &'static str;
}

/// Probe backed by the operating system's appearance settings
pub struct PlatformProbe;

impl ColorSchemeProbe for PlatformProbe {
    fn query_dark(&self) -> Option<bool> {
        detect_system_dark()
    }

    fn name(&self) -> &'static str {
        std::env::consts::OS
    }
}

/// Probe returning a fixed answer; used by headless hosts that only learn the
/// scheme from notifications
pub struct StaticProbe(pub Option<bool>);

impl ColorSchemeProbe for StaticProbe {
    fn query_dark(&self) -> Option<bool> {
        self.0
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct SystemColorScheme {
    probe: Box<dyn ColorSchemeProbe>,
    observed: Mutex<Option<bool>>,
}

impl SystemColorScheme {
    pub fn new(probe: Box<dyn ColorSchemeProbe>) -> Self {
        log::debug!("Using '{}' color scheme probe", probe.name());
        Self {
            probe,
            observed: Mutex::new(None),
        }
    }

    /// Resolve the probe for the platform we are running on
    pub fn platform() -> Self {
        Self::new(Box::new(PlatformProbe))
    }

    /// Record a value delivered by a live change notification
    pub fn observe(&self, is_dark: bool) {
        if let Ok(mut observed) = self.observed.lock() {
            *observed = Some(is_dark);
        }
    }

    pub fn observed(&self) -> Option<bool> {
        self.observed.lock().ok().and_then(|observed| *observed)
    }

    pub fn is_dark(&self) -> bool {
        if let Some(is_dark) = self.observed() {
            return is_dark;
        }
        self.probe.query_dark().unwrap_or(false)
    }
}

#[cfg(target_os = "macos")]
pub fn detect_system_dark() -> Option<bool> {
    // `defaults read -g AppleInterfaceStyle` returns "Dark" in dark mode and exits non-zero in light mode.
    if let Ok(output) = std::process::Command::new("defaults")
        .args(["read", "-g", "AppleInterfaceStyle"])
        .output()
    {
        if output.status.success() {
            let style = String::from_utf8_lossy(&output.stdout);
            return Some(style.to_ascii_lowercase().contains("dark"));
        }
    }

    use cocoa::appkit::NSApp;
    use cocoa::base::nil;
    use objc::runtime::Object;
    use objc::{msg_send, sel, sel_impl};

    unsafe {
        let ns_app = NSApp();
        if ns_app == nil {
            return None;
        }
        let appearance: *mut Object = msg_send![ns_app, effectiveAppearance];
        if appearance.is_null() {
            return None;
        }
        let name: *mut Object = msg_send![appearance, name];
        if name.is_null() {
            return None;
        }
        let utf8: *const std::os::raw::c_char = msg_send![name, UTF8String];
        if utf8.is_null() {
            return None;
        }
        let name_str = std::ffi::CStr::from_ptr(utf8).to_string_lossy();
        Some(name_str.contains("Dark"))
    }
}

#[cfg(target_os = "windows")]
pub fn detect_system_dark() -> Option<bool> {
    // Documents follow the app theme, not the taskbar theme.
    use winreg::enums::HKEY_CURRENT_USER;
    use winreg::RegKey;

    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let personalize = hkcu
        .open_subkey("Software\\Microsoft\\Windows\\CurrentVersion\\Themes\\Personalize")
        .ok()?;

    if let Ok(light_theme) = personalize.get_value::<u32, _>("AppsUseLightTheme") {
        return Some(light_theme == 0);
    }
    if let Ok(system_light_theme) = personalize.get_value::<u32, _>("SystemUsesLightTheme") {
        return Some(system_light_theme == 0);
    }
    None
}

#[cfg(target_os = "linux")]
pub fn detect_system_dark() -> Option<bool> {
    if let Ok(output) = std::process::Command::new("gsettings")
        .args(["get", "org.gnome.desktop.interface", "color-scheme"])
        .output()
    {
        if output.status.success() {
            let scheme = String::from_utf8_lossy(&output.stdout).to_ascii_lowercase();
            if scheme.contains("dark") {
                return Some(true);
            }
            if scheme.contains("light") {
                return Some(false);
            }
        }
    }

    for var in ["GTK_THEME", "KDE_COLOR_SCHEME"] {
        if let Ok(theme) = std::env::var(var) {
            if theme.to_ascii_lowercase().contains("dark") {
                return Some(true);
            }
        }
    }

    if let Ok(colorfgbg) = std::env::var("COLORFGBG") {
        if let Some(bg) = colorfgbg.split(';').next_back().and_then(|v| v.parse::<u8>().ok()) {
            return Some(bg <= 6);
        }
    }

    None
}

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
pub fn detect_system_dark() -> Option<bool> {
    None
}
