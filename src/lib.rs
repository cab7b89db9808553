mod alarm;
pub mod automation;
mod barrier;
pub mod collaborators;
mod commands;
mod context_menu;
mod debounce;
pub mod dispatcher;
mod error;
mod extension;
pub mod headless;
mod reconciler;
pub mod settings;
pub mod sites;
mod state;
mod store;
pub mod theme;
pub mod time;

pub use alarm::TokioAlarms;
pub use automation::{AutomationOutcome, AUTOMATION_ALARM};
pub use barrier::StartBarrier;
pub use collaborators::Collaborators;
pub use commands::{Command, CommandGate, COMMAND_DEBOUNCE};
pub use context_menu::ContextMenuRegistrar;
pub use debounce::Debouncer;
pub use dispatcher::{SvgEncoding, TabMessage, ThemeSource};
pub use error::{ExtensionError, ExtensionResult};
pub use extension::{ActiveTabInfo, Extension, ExtensionData};
pub use reconciler::SettingsDiff;
pub use settings::{
    Automation, AutomationBehaviour, SettingsPatch, Theme, ThemeEngine, ThemeMode, ThemePatch,
    UserSettings,
};
pub use state::{ExtensionState, StateManager, STATE_STORAGE_KEY};
pub use store::JsonFileStore;
pub use theme::SystemColorScheme;
