//! Command policy settings: the rule document RuleStore is built from.

use serde::{Deserialize, Serialize};

/// Verdict a rule assigns to a matching sub-command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleVerdict {
    /// Let the command run.
    Allow,
    /// Require human confirmation.
    Ask,
    /// Refuse the command.
    Deny,
}

/// How a rule's pattern is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Literal text.
    #[default]
    Prefix,
    /// Regular expression.
    Regex,
}

/// What part of the sub-command a rule is matched against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    /// Pattern must match at the start of the normalized sub-command,
    /// on a word boundary.
    #[default]
    CommandPrefix,
    /// Pattern must match the whole sub-command text.
    FullMatch,
}

/// Tag that escalates an allow match to a confirmation prompt.
pub const ALWAYS_CONFIRM_TAG: &str = "always-confirm";

/// One configured rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    /// Unique rule identifier.
    pub id: String,
    /// Literal prefix or regex source, depending on `kind`.
    pub pattern: String,
    /// Pattern interpretation.
    #[serde(default)]
    pub kind: RuleKind,
    /// Verdict on match.
    pub verdict: RuleVerdict,
    /// Match scope.
    #[serde(default)]
    pub scope: RuleScope,
    /// Operator note, surfaced as the verdict reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Free-form tags (`always-confirm` is interpreted).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Disabled rules are loaded but never match.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RuleConfig {
    /// Shorthand for a literal-prefix rule.
    #[must_use]
    pub fn prefix(id: &str, pattern: &str, verdict: RuleVerdict) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            kind: RuleKind::Prefix,
            verdict,
            scope: RuleScope::CommandPrefix,
            note: None,
            tags: Vec::new(),
            enabled: true,
        }
    }

    /// Shorthand for a regex rule.
    #[must_use]
    pub fn regex(id: &str, pattern: &str, verdict: RuleVerdict) -> Self {
        Self {
            kind: RuleKind::Regex,
            ..Self::prefix(id, pattern, verdict)
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set the match scope.
    #[must_use]
    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }
}

fn default_true() -> bool {
    true
}

/// Policy audit log settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyAuditSettings {
    /// Whether non-allow verdicts are appended to `audit.jsonl`.
    pub enabled: bool,
    /// Maximum entries kept in memory per process.
    pub max_entries: usize,
}

impl Default for PolicyAuditSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
        }
    }
}

/// Command policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicySettings {
    /// Verdict for sub-commands no rule matches.
    pub default_verdict: RuleVerdict,
    /// Load the built-in rule set before user rules.
    pub include_builtin_rules: bool,
    /// User rules, in file order.
    pub rules: Vec<RuleConfig>,
    /// Audit configuration.
    pub audit: PolicyAuditSettings,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            default_verdict: RuleVerdict::Ask,
            include_builtin_rules: true,
            rules: Vec::new(),
            audit: PolicyAuditSettings::default(),
        }
    }
}
