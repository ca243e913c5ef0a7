//! Error types for the policy layer.

use thiserror::Error;

/// Errors raised while building a rule store.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A user rule tried to replace or disable a core rule.
    #[error("cannot override core rule: {rule_id}")]
    CoreRuleProtected {
        /// The ID of the core rule.
        rule_id: String,
    },

    /// Two user rules share an id.
    #[error("duplicate rule id: {rule_id}")]
    DuplicateRule {
        /// The repeated ID.
        rule_id: String,
    },

    /// Invalid rule definition.
    #[error("invalid rule {rule_id}: {message}")]
    InvalidRule {
        /// The offending rule.
        rule_id: String,
        /// Description of the problem.
        message: String,
    },
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
