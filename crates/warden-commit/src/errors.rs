//! Commit guard errors.

use thiserror::Error;
use warden_core::WardenError;

/// Errors from the commit guard.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The attempt failed validation. The message is left untouched.
    #[error("commit rejected: {}", reasons.join("; "))]
    Rejected {
        /// Every failed check, in check order.
        reasons: Vec<String>,
        /// Advisory findings gathered alongside.
        warnings: Vec<String>,
    },

    /// A configured forbidden pattern does not compile.
    #[error("invalid commit pattern {pattern}: {source}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Compile error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for commit validation.
pub type Result<T> = std::result::Result<T, CommitError>;

impl CommitError {
    /// User-facing outcome for a rejection.
    #[must_use]
    pub fn to_outcome(&self) -> WardenError {
        match self {
            Self::Rejected { reasons, .. } => WardenError::ValidationRejected {
                reason: reasons.join("; "),
            },
            Self::InvalidPattern { .. } => WardenError::ValidationRejected {
                reason: self.to_string(),
            },
        }
    }
}
