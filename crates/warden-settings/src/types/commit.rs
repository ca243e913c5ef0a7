//! Commit message validation settings.

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Commit guard configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitSettings {
    /// Whether commits are validated at all.
    pub enabled: bool,
    /// Conventional-commit types.
    pub types: Vec<String>,
    /// Allowed scopes (empty = any scope).
    pub scopes: Vec<String>,
    /// Reject (instead of warn about) non-conventional subjects.
    pub require_conventional: bool,
    /// Reject `Co-Authored-By:` trailers.
    pub block_co_authored: bool,
    /// Attribution boilerplate that rejects a message (case-insensitive).
    pub attribution_phrases: Vec<String>,
    /// Markers that reject a message when present (word match).
    pub forbidden_patterns: Vec<String>,
    /// Shortest acceptable subject.
    pub min_subject_length: usize,
    /// Longest acceptable subject.
    pub max_subject_length: usize,
    /// Body lines longer than this produce a warning.
    pub max_body_line_length: usize,
    /// Warn on past-tense subjects ("added", "fixed").
    pub check_imperative: bool,
}

impl Default for CommitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            types: strings(&[
                "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "ci",
                "build", "revert",
            ]),
            scopes: Vec::new(),
            require_conventional: false,
            block_co_authored: true,
            attribution_phrases: strings(&[
                "Generated with Claude",
                "Claude Code",
                "noreply@anthropic.com",
            ]),
            forbidden_patterns: strings(&["TODO", "FIXME", "XXX", "HACK"]),
            min_subject_length: 10,
            max_subject_length: 72,
            max_body_line_length: 100,
            check_imperative: true,
        }
    }
}
