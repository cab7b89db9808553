//! Error types for the orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtensionError {
    /// Settings or state were needed before they could be loaded
    #[error("Not ready: {0}")]
    NotReady(String),

    /// A resolved theme carries an engine this build does not know
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A capability was used without the underlying grant
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Settings/state persistence failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// A collaborator (tabs, window theme, news...) failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

pub type ExtensionResult<T> = Result<T, ExtensionError>;
