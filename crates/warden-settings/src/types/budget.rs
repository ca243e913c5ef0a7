//! Token budget settings.

use serde::{Deserialize, Serialize};

/// Per-session token budget.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetSettings {
    /// Whether the budget gate is active.
    pub enabled: bool,
    /// Inclusive per-session ceiling (usage == limit is still within budget).
    pub session_limit: u64,
    /// Fraction of the limit at which status becomes `Warning`.
    pub warning_ratio: f64,
    /// Fraction of the limit at which status becomes `Critical`.
    pub critical_ratio: f64,
    /// Advisory ceiling on usage accumulated across all sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_limit: Option<u64>,
    /// Hours after a session boundary at which the next reset is expected.
    /// Informational only; resets happen at explicit boundaries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_window_hours: Option<u64>,
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            session_limit: 180_000,
            warning_ratio: 0.75,
            critical_ratio: 0.9,
            total_limit: Some(500_000),
            reset_window_hours: None,
        }
    }
}
