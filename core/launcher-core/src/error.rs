//! Error types for launcher-core operations.
//! `LauncherError::code()` is part of the wire contract; keep the names stable.

use std::path::PathBuf;

/// All errors that can occur in launcher-core operations.
///
/// Config and state-value errors are recovered where they occur (default
/// substitution or a logged no-op); they exist as variants so the recovery
/// sites can log a typed value.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    // ─────────────────────────────────────────────────────────────────────
    // Process Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Failed to launch {command}: {details}")]
    LaunchFailure { command: String, details: String },

    #[error("Platform not supported for this operation: {0}")]
    PlatformUnsupported(String),

    #[error("Failed to request termination of process {pid}: {details}")]
    TerminateFailed { pid: u32, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration directory could not be determined")]
    ConfigDirNotFound,

    #[error("Configuration I/O failed: {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    // ─────────────────────────────────────────────────────────────────────
    // Command Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Unsupported {axis} value: {value:?}")]
    InvalidStateValue { axis: &'static str, value: String },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid payload for {command}: {details}")]
    InvalidPayload { command: String, details: String },

    #[error("Launcher runtime is no longer running")]
    RuntimeStopped,
}

impl LauncherError {
    /// Stable taxonomy name reported in the `error` field of a failed response.
    pub fn code(&self) -> &'static str {
        match self {
            LauncherError::LaunchFailure { .. } => "LaunchFailure",
            LauncherError::PlatformUnsupported(_) => "PlatformUnsupported",
            LauncherError::TerminateFailed { .. } => "TerminateFailed",
            LauncherError::ConfigDirNotFound
            | LauncherError::ConfigIo { .. }
            | LauncherError::ConfigMalformed { .. } => "ConfigIOFailure",
            LauncherError::InvalidStateValue { .. } => "InvalidStateValue",
            LauncherError::UnknownCommand(_) => "UnknownCommand",
            LauncherError::InvalidPayload { .. } => "InvalidPayload",
            LauncherError::RuntimeStopped => "RuntimeStopped",
        }
    }

    pub(crate) fn launch(command: impl Into<String>, details: impl ToString) -> Self {
        LauncherError::LaunchFailure {
            command: command.into(),
            details: details.to_string(),
        }
    }
}

/// Convenience type alias for Results using LauncherError.
pub type Result<T> = std::result::Result<T, LauncherError>;

impl From<LauncherError> for String {
    fn from(err: LauncherError) -> String {
        err.to_string()
    }
}

impl From<lazy_launcher_protocol::UnsupportedValue> for LauncherError {
    fn from(err: lazy_launcher_protocol::UnsupportedValue) -> Self {
        LauncherError::InvalidStateValue {
            axis: err.axis,
            value: err.value,
        }
    }
}
