//! Load-time validation.
//!
//! Settings that would make a gate ambiguous (duplicate rule ids,
//! uncompilable patterns, nonsensical limits) are rejected up front rather
//! than discovered mid-session.

use std::collections::HashSet;

use regex::Regex;

use crate::errors::{Result, SettingsError};
use crate::types::{RuleKind, WardenSettings};

/// Validate a fully merged settings document.
pub fn validate_settings(settings: &WardenSettings) -> Result<()> {
    let mut seen = HashSet::new();
    for rule in &settings.policy.rules {
        if rule.id.trim().is_empty() {
            return Err(invalid("policy rule with empty id"));
        }
        if !seen.insert(rule.id.as_str()) {
            return Err(invalid(format!("duplicate rule id: {}", rule.id)));
        }
        if rule.pattern.trim().is_empty() {
            return Err(invalid(format!("rule {} has an empty pattern", rule.id)));
        }
        if rule.kind == RuleKind::Regex {
            compile(&rule.id, &rule.pattern)?;
        }
    }

    for p in &settings.scanner.extra_secret_patterns {
        compile(&p.id, &p.pattern)?;
    }
    for p in &settings.scanner.forbidden_patterns {
        compile(&p.id, &p.pattern)?;
    }

    let budget = &settings.budget;
    if budget.session_limit == 0 {
        return Err(invalid("budget.sessionLimit must be positive"));
    }
    let ratio_ok = |r: f64| r > 0.0 && r <= 1.0;
    if !ratio_ok(budget.warning_ratio) || !ratio_ok(budget.critical_ratio) {
        return Err(invalid("budget ratios must be in (0, 1]"));
    }
    if budget.warning_ratio > budget.critical_ratio {
        return Err(invalid("budget.warningRatio must not exceed budget.criticalRatio"));
    }

    let continuity = &settings.continuity;
    if continuity.enabled && continuity.summarizer_command.is_empty() {
        return Err(invalid("continuity.summarizerCommand must not be empty"));
    }
    if continuity.summarizer_timeout_secs == 0 {
        return Err(invalid("continuity.summarizerTimeoutSecs must be positive"));
    }

    let commit = &settings.commit;
    if commit.min_subject_length > commit.max_subject_length {
        return Err(invalid("commit.minSubjectLength exceeds commit.maxSubjectLength"));
    }

    Ok(())
}

fn compile(id: &str, pattern: &str) -> Result<()> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| invalid(format!("pattern {id} does not compile: {e}")))
}

fn invalid(message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue(message.into())
}
