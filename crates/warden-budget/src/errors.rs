//! Budget error types.

use thiserror::Error;

/// Errors from the budget monitor.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Consumption is strictly above the inclusive limit.
    #[error("token budget exceeded for session {session_id}: {consumed}/{limit}")]
    Exceeded {
        /// Session whose budget is spent.
        session_id: String,
        /// Tokens consumed.
        consumed: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The usage ledger could not be read or written.
    #[error("usage ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for budget operations.
pub type Result<T> = std::result::Result<T, BudgetError>;

impl BudgetError {
    /// Whether this is a spent budget rather than an I/O failure.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}
