//! Hook error types.

use thiserror::Error;

/// Errors raised while running hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// A handler did not finish in time.
    #[error("hook {name} timed out after {timeout_ms}ms")]
    Timeout {
        /// Handler name.
        name: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// A handler failed.
    #[error("hook handler {name} failed: {message}")]
    Handler {
        /// Handler name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The host payload could not be understood.
    #[error("invalid hook input: {0}")]
    InvalidInput(String),

    /// Unknown hook event name.
    #[error("unknown hook event: {0}")]
    UnknownEvent(String),

    /// A component could not be built from settings.
    #[error("hook setup failed: {0}")]
    Setup(String),
}

impl HookError {
    /// Handler failure with `name` attached.
    pub fn handler(name: &str, message: impl std::fmt::Display) -> Self {
        Self::Handler {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

/// Result type for hook operations.
pub type Result<T> = std::result::Result<T, HookError>;
