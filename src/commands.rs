use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::debounce::Debouncer;
use crate::error::ExtensionError;
use crate::extension::Extension;

/// Window in which repeated keyboard commands collapse into one
pub const COMMAND_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Toggle,
    AddSite,
    SwitchEngine,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Toggle, Command::AddSite, Command::SwitchEngine];

    pub fn as_str(self) -> &'static str {
        match self {
            Command::Toggle => "toggle",
            Command::AddSite => "addSite",
            Command::SwitchEngine => "switchEngine",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| ExtensionError::UnknownCommand(s.to_string()))
    }
}

/// Debounced entry point for external commands.
///
/// Bursts within the window run once, with the last command's arguments.
/// Execution waits for the extension's start barrier.
pub struct CommandGate {
    debouncer: Debouncer<(Command, Option<String>)>,
}

impl CommandGate {
    pub fn new(extension: Arc<Extension>) -> Self {
        Self::with_window(extension, COMMAND_DEBOUNCE)
    }

    pub fn with_window(extension: Arc<Extension>, window: Duration) -> Self {
        let debouncer = Debouncer::new(window, move |(command, arg): (Command, Option<String>)| {
            let extension = Arc::clone(&extension);
            async move {
                if let Err(e) = extension.handle_command(command, arg).await {
                    log::error!("Command {} failed: {}", command, e);
                }
            }
        });
        Self { debouncer }
    }

    pub fn on_command(&self, command: Command, arg: Option<String>) -> JoinHandle<()> {
        log::debug!("Command {} received", command);
        self.debouncer.call((command, arg))
    }

    pub fn on_named_command(&self, name: &str, arg: Option<String>) -> Result<JoinHandle<()>, ExtensionError> {
        let command: Command = name.parse()?;
        Ok(self.on_command(command, arg))
    }
}
