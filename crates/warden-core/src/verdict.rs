//! Command gate verdicts.
//!
//! A [`Verdict`] is the single decision produced for one command
//! evaluation. Kinds are totally ordered by severity
//! (`Allow < AskUser < Deny`) so that combining verdicts can only ever
//! escalate.

use serde::{Deserialize, Serialize};

/// Decision kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictKind {
    /// Let the action proceed.
    Allow,
    /// Suspend and let the host ask the human.
    AskUser,
    /// Refuse the action.
    Deny,
}

impl VerdictKind {
    /// Wire form used in the host protocol (`allow` / `ask` / `deny`).
    #[must_use]
    pub fn as_decision(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AskUser => "ask",
            Self::Deny => "deny",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::AskUser => write!(f, "AskUser"),
            Self::Deny => write!(f, "Deny"),
        }
    }
}

/// The rule responsible for a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRule {
    /// Rule identifier.
    pub id: String,
    /// Source pattern of the rule.
    pub pattern: String,
    /// Sub-command the rule matched, when the command was compound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// One decision for one command evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Decision.
    pub kind: VerdictKind,
    /// Rule that produced the decision. `None` for the configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<MatchedRule>,
    /// Human-readable reason.
    pub reason: String,
}

impl Verdict {
    /// Create an `Allow` verdict.
    #[must_use]
    pub fn allow(rule: Option<MatchedRule>, reason: impl Into<String>) -> Self {
        Self {
            kind: VerdictKind::Allow,
            rule,
            reason: reason.into(),
        }
    }

    /// Create an `AskUser` verdict.
    #[must_use]
    pub fn ask_user(rule: Option<MatchedRule>, reason: impl Into<String>) -> Self {
        Self {
            kind: VerdictKind::AskUser,
            rule,
            reason: reason.into(),
        }
    }

    /// Create a `Deny` verdict.
    #[must_use]
    pub fn deny(rule: Option<MatchedRule>, reason: impl Into<String>) -> Self {
        Self {
            kind: VerdictKind::Deny,
            rule,
            reason: reason.into(),
        }
    }

    /// Whether the action may proceed without confirmation.
    #[must_use]
    pub fn is_allow(&self) -> bool {
        self.kind == VerdictKind::Allow
    }

    /// Whether the action is refused.
    #[must_use]
    pub fn is_deny(&self) -> bool {
        self.kind == VerdictKind::Deny
    }

    /// Id of the responsible rule, if any.
    pub fn rule_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.id.as_str())
    }

    /// Combine two verdicts, keeping the more severe one.
    ///
    /// On equal severity the receiver is kept, so the first decisive
    /// sub-command stays the reported one.
    #[must_use]
    pub fn escalate(self, other: Verdict) -> Verdict {
        if other.kind > self.kind { other } else { self }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
