//! User-facing outcome taxonomy.
//!
//! Crate-level error enums describe *why an operation failed*; this enum
//! describes *what the user sees*. Gating components convert their results
//! into one of these variants at the host boundary.

use thiserror::Error;

/// Outcomes surfaced to the user (or logged, for [`WardenError::PipelineDegraded`]).
#[derive(Debug, Error)]
pub enum WardenError {
    /// A command matched a deny rule.
    #[error("blocked by policy rule {rule_id}: {reason}")]
    PolicyViolation {
        /// Responsible rule.
        rule_id: String,
        /// Rule note or generated reason.
        reason: String,
    },

    /// The session's token budget is spent.
    #[error("token budget exceeded for session {session_id}: {consumed}/{limit} used, {remaining} remaining")]
    BudgetExceeded {
        /// Session whose budget is spent.
        session_id: String,
        /// Tokens consumed so far.
        consumed: u64,
        /// Configured ceiling.
        limit: u64,
        /// Tokens left (always zero once exceeded).
        remaining: u64,
    },

    /// A changed file contains a secret. Carries a redacted location only.
    #[error("secret detected at {location} ({detector}); write refused")]
    ScanBlocking {
        /// `path:line` of the finding.
        location: String,
        /// Name of the detector that fired.
        detector: String,
    },

    /// A commit message failed validation.
    #[error("commit rejected: {reason}")]
    ValidationRejected {
        /// All rejection reasons, joined.
        reason: String,
    },

    /// A continuity pipeline stage failed. Never shown to the interactive user.
    #[error("continuity pipeline degraded at {stage}: {message}")]
    PipelineDegraded {
        /// Stage that failed.
        stage: String,
        /// Failure description.
        message: String,
    },
}

impl WardenError {
    /// Whether this outcome stops the attempted action.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Self::PipelineDegraded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_display_carries_numbers() {
        let err = WardenError::BudgetExceeded {
            session_id: "s1".into(),
            consumed: 1200,
            limit: 1000,
            remaining: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("1200/1000"));
        assert!(msg.contains("0 remaining"));
    }

    #[test]
    fn degraded_is_not_blocking() {
        let err = WardenError::PipelineDegraded {
            stage: "Summarizing".into(),
            message: "timeout".into(),
        };
        assert!(!err.is_blocking());
        assert!(
            WardenError::ValidationRejected {
                reason: "x".into()
            }
            .is_blocking()
        );
    }
}
