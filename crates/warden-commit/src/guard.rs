//! Commit message validation.
//!
//! Validation reads the attempt and never rewrites it: a failing message is
//! rejected with every reason so the caller can re-propose.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};
use warden_settings::CommitSettings;

use crate::attempt::CommitAttempt;
use crate::errors::{CommitError, Result};

static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<type>[a-z]+)(?:\((?P<scope>[^)]+)\))?(?P<bang>!)?: (?P<desc>.+)$").unwrap()
});

static CO_AUTHORED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^\s*co-authored-by\s*:").unwrap());

/// Past-tense openings that should be imperative ("add", not "added").
const PAST_TENSE: &[&str] = &[
    "added",
    "fixed",
    "updated",
    "removed",
    "refactored",
    "implemented",
    "improved",
    "optimized",
    "enhanced",
    "resolved",
    "deleted",
    "changed",
    "created",
    "modified",
    "renamed",
    "moved",
];

/// Validates commit attempts against [`CommitSettings`].
#[derive(Debug)]
pub struct CommitGuard {
    settings: CommitSettings,
    forbidden: Vec<(String, Regex)>,
}

impl CommitGuard {
    /// Build a guard. Forbidden subject patterns match as whole words.
    pub fn new(settings: &CommitSettings) -> Result<Self> {
        let forbidden = settings
            .forbidden_patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                Regex::new(&format!(r"\b{}\b", regex::escape(p)))
                    .map(|re| (p.clone(), re))
                    .map_err(|source| CommitError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            settings: settings.clone(),
            forbidden,
        })
    }

    /// Validate an attempt.
    ///
    /// Returns the advisory warnings on success, or every rejection reason.
    pub fn validate(&self, attempt: &CommitAttempt) -> Result<Vec<String>> {
        if !self.settings.enabled {
            return Ok(Vec::new());
        }

        let mut errors = self.check_options(attempt);
        let mut warnings = Vec::new();

        match attempt.message.as_deref() {
            None => debug!("commit message comes from the editor; not validated"),
            Some(message) => self.check_message(message, &mut errors, &mut warnings),
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            info!(reasons = errors.len(), "commit rejected");
            Err(CommitError::Rejected {
                reasons: errors,
                warnings,
            })
        }
    }

    /// Validate a bare message.
    pub fn validate_message(&self, message: &str) -> Result<Vec<String>> {
        self.validate(&CommitAttempt::new(message))
    }

    fn check_options(&self, attempt: &CommitAttempt) -> Vec<String> {
        let mut errors = Vec::new();
        for flag in &attempt.flags {
            match flag.as_str() {
                "--no-verify" => errors.push("`--no-verify` skips commit hooks and is not allowed".to_string()),
                "--no-gpg-sign" => errors.push("`--no-gpg-sign` bypasses commit signing and is not allowed".to_string()),
                _ => {}
            }
        }
        for override_ in &attempt.config_overrides {
            let lower = override_.to_ascii_lowercase();
            if lower.starts_with("core.hookspath") {
                errors.push(format!("`-c {override_}` redirects commit hooks and is not allowed"));
            } else if lower.replace(' ', "") == "commit.gpgsign=false" {
                errors.push(format!("`-c {override_}` disables commit signing and is not allowed"));
            }
        }
        errors
    }

    fn check_message(&self, message: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            errors.push("commit message is empty".to_string());
            return;
        }
        let lines: Vec<&str> = trimmed.lines().collect();
        let subject = lines[0].trim();

        if self.settings.block_co_authored && CO_AUTHORED.is_match(trimmed) {
            errors.push("`Co-Authored-By` trailers are not allowed; commit as a single author".to_string());
        }
        let lower = trimmed.to_lowercase();
        for phrase in &self.settings.attribution_phrases {
            if !phrase.is_empty() && lower.contains(&phrase.to_lowercase()) {
                errors.push(format!("remove attribution boilerplate `{phrase}`"));
            }
        }

        let length = subject.chars().count();
        if length < self.settings.min_subject_length {
            errors.push(format!(
                "subject is too short ({length} chars, minimum {})",
                self.settings.min_subject_length
            ));
        }
        if length > self.settings.max_subject_length {
            errors.push(format!(
                "subject is too long ({length} chars, maximum {})",
                self.settings.max_subject_length
            ));
        }
        for (pattern, regex) in &self.forbidden {
            if regex.is_match(subject) {
                errors.push(format!("remove `{pattern}` from the subject"));
            }
        }
        if lines.len() > 1 && !lines[1].trim().is_empty() {
            errors.push("add a blank line between the subject and the body".to_string());
        }

        self.check_conventional(subject, errors, warnings);

        for (idx, line) in lines.iter().enumerate().skip(2) {
            let width = line.chars().count();
            if width > self.settings.max_body_line_length {
                warnings.push(format!(
                    "body line {} is {width} chars (limit {})",
                    idx + 1,
                    self.settings.max_body_line_length
                ));
            }
        }
    }

    fn check_conventional(&self, subject: &str, errors: &mut Vec<String>, warnings: &mut Vec<String>) {
        let description = match CONVENTIONAL.captures(subject) {
            Some(caps) => {
                let kind = caps.name("type").map_or("", |m| m.as_str());
                if !self.settings.types.is_empty() && !self.settings.types.iter().any(|t| t == kind) {
                    warnings.push(format!(
                        "unknown commit type `{kind}` (expected one of: {})",
                        self.settings.types.join(", ")
                    ));
                }
                if let Some(scope) = caps.name("scope").map(|m| m.as_str()) {
                    if !self.settings.scopes.is_empty() && !self.settings.scopes.iter().any(|s| s == scope) {
                        warnings.push(format!("unknown scope `{scope}`"));
                    }
                }
                let desc = caps.name("desc").map_or("", |m| m.as_str());
                if desc.chars().next().is_some_and(char::is_uppercase) {
                    warnings.push("description should start with a lowercase letter".to_string());
                }
                desc
            }
            None => {
                let msg = "subject does not follow `type(scope): description`".to_string();
                if self.settings.require_conventional {
                    errors.push(msg);
                } else {
                    warnings.push(msg);
                }
                subject
            }
        };

        if self.settings.check_imperative {
            let first = description
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_lowercase();
            if PAST_TENSE.contains(&first.as_str()) {
                warnings.push(format!("use the imperative mood (`{first}` reads as past tense)"));
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
