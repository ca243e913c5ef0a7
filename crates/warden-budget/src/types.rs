//! Usage records and status reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::SessionId;

/// Running token usage for one session.
///
/// `consumed` only grows between explicit resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    /// Session the usage belongs to.
    pub session_id: SessionId,
    /// Tokens charged since the last reset.
    pub consumed: u64,
    /// Inclusive ceiling.
    pub limit: u64,
    /// When the next reset is expected, if a reset window is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<DateTime<Utc>>,
    /// Last cumulative total reported by the host.
    #[serde(default)]
    pub last_observed: u64,
    /// Start of the current accounting period.
    pub started_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl TokenUsage {
    /// Fresh usage record.
    #[must_use]
    pub fn new(session_id: SessionId, limit: u64, resets_at: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            consumed: 0,
            limit,
            resets_at,
            last_observed: 0,
            started_at: now,
            updated_at: now,
        }
    }

    /// Tokens left before the limit (zero once exceeded).
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.consumed)
    }

    /// Whether usage is strictly above the inclusive limit.
    #[must_use]
    pub fn is_exceeded(&self) -> bool {
        self.consumed > self.limit
    }
}

/// Coarse budget level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    /// Below the warning ratio.
    Ok,
    /// At or above the warning ratio.
    Warning,
    /// At or above the critical ratio.
    Critical,
    /// Strictly above the limit.
    Exceeded,
}

impl std::fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// Point-in-time report for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    /// Session.
    pub session_id: SessionId,
    /// Tokens consumed.
    pub consumed: u64,
    /// Inclusive limit.
    pub limit: u64,
    /// Tokens left.
    pub remaining: u64,
    /// `consumed / limit`.
    pub ratio: f64,
    /// Level.
    pub level: BudgetLevel,
    /// Usage accumulated across all sessions.
    pub total_accumulated: u64,
    /// Advisory ceiling across sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_limit: Option<u64>,
}

impl BudgetStatus {
    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} tokens ({:.1}%), {} remaining [{}]",
            self.consumed,
            self.limit,
            self.ratio * 100.0,
            self.remaining,
            self.level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_is_inclusive() {
        let mut usage = TokenUsage::new(SessionId::from("s"), 100, None);
        usage.consumed = 100;
        assert!(!usage.is_exceeded());
        assert_eq!(usage.remaining(), 0);
        usage.consumed = 101;
        assert!(usage.is_exceeded());
        assert_eq!(usage.remaining(), 0);
    }

    #[test]
    fn level_ordering() {
        assert!(BudgetLevel::Ok < BudgetLevel::Warning);
        assert!(BudgetLevel::Critical < BudgetLevel::Exceeded);
    }
}
