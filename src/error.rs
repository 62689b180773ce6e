//! Error types for the iteration engine
//!
//! Every variant owns its data as plain strings so that an error can be
//! cloned: a failed thunk hands the same error to each caller that asks for
//! it, and the driver returns the original value after hooks have seen it.

use crate::iterator::ShutdownRequest;
use thiserror::Error;

/// Result type alias for hookloop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while driving a model over its data splits.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A termination signal was received. Not a failure: hooks get a chance
    /// to persist final state before the process exits.
    #[error("{0}")]
    Shutdown(ShutdownRequest),

    /// A hook's lifecycle callback failed.
    #[error("Hook '{hook}' failed: {message}")]
    Hook { hook: String, message: String },

    /// A fetch op failed while being evaluated against the model.
    #[error("Fetch op '{op}' failed: {message}")]
    Fetch { op: String, message: String },

    /// A split stream does not satisfy the stream contract.
    #[error("Split '{split}' violates the stream contract: {message}")]
    StreamContract { split: String, message: String },

    /// A split was requested that is not registered.
    #[error("Split '{0}' is not registered")]
    MissingSplit(String),

    /// Step state was restored after iteration had started.
    #[error("Global step can only be restored before the first tick")]
    AlreadyStarted,

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkpoint could not be read or written.
    #[error("Checkpoint error at {path}: {message}")]
    Checkpoint { path: String, message: String },
}

impl Error {
    /// Create a hook failure.
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook { hook: hook.into(), message: message.into() }
    }

    /// Create a fetch op failure.
    pub fn fetch(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch { op: op.into(), message: message.into() }
    }

    /// Create a stream contract violation.
    pub fn stream_contract(split: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamContract { split: split.into(), message: message.into() }
    }

    /// Whether this error is the signal-driven shutdown condition.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown(_))
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Shutdown(_) => "E000",
            Self::Hook { .. } => "E010",
            Self::Fetch { .. } => "E020",
            Self::StreamContract { .. } => "E030",
            Self::MissingSplit(_) => "E031",
            Self::AlreadyStarted => "E040",
            Self::Config(_) => "E050",
            Self::Checkpoint { .. } => "E060",
        }
    }
}

impl From<crate::config::ValidationError> for Error {
    fn from(err: crate::config::ValidationError) -> Self {
        Self::Config(err.to_string())
    }
}
