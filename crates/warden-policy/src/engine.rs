//! Command policy engine.
//!
//! Classifies an attempted command against the [`RuleStore`]. The command
//! is split into sub-commands; each is decided by its most specific rule
//! (core rules always win) and the overall verdict is the most severe
//! sub-command verdict. Unmatched sub-commands take the configured default,
//! which is `AskUser` unless an operator changes it.
//!
//! Evaluation never executes anything. Its only side effect is auditing
//! non-allow verdicts.

use std::path::Path;

use tracing::{debug, warn};
use warden_core::verdict::{MatchedRule, Verdict, VerdictKind};
use warden_core::SessionContext;
use warden_settings::PolicySettings;

use crate::audit::{AuditEntry, AuditLog};
use crate::errors::Result;
use crate::rules::Rule;
use crate::split::{SubCommand, collapse_whitespace, split_command};
use crate::store::RuleStore;

/// Classifies commands into allow / ask / deny.
#[derive(Debug)]
pub struct CommandPolicyEngine {
    store: RuleStore,
    audit: Option<AuditLog>,
}

impl CommandPolicyEngine {
    /// Engine over a store, without auditing.
    #[must_use]
    pub fn new(store: RuleStore) -> Self {
        Self { store, audit: None }
    }

    /// Engine from settings, auditing to `audit_file` when auditing is enabled.
    pub fn from_settings(settings: &PolicySettings, audit_file: Option<&Path>) -> Result<Self> {
        let store = RuleStore::from_settings(settings)?;
        let mut engine = Self::new(store);
        if settings.audit.enabled {
            let mut audit = AuditLog::new(settings.audit.max_entries);
            if let Some(path) = audit_file {
                audit = audit.with_file(path);
            }
            engine.audit = Some(audit);
        }
        Ok(engine)
    }

    /// Attach an audit log.
    #[must_use]
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// The underlying rule store.
    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// The audit log, if enabled.
    pub fn audit(&self) -> Option<&AuditLog> {
        self.audit.as_ref()
    }

    /// Evaluate a command and audit the verdict if it is not `Allow`.
    pub fn evaluate(&self, command: &str, ctx: &SessionContext) -> Verdict {
        let verdict = self.classify(command);
        if verdict.is_allow() {
            debug!(session_id = %ctx.session_id, "command allowed");
        } else {
            warn!(
                session_id = %ctx.session_id,
                rule_id = verdict.rule_id().unwrap_or("default"),
                verdict = %verdict.kind,
                command = %command,
                "command not allowed"
            );
            if let Some(audit) = &self.audit {
                audit.record(AuditEntry::new(command, &verdict, ctx));
            }
        }
        verdict
    }

    /// Classify a command without auditing.
    pub fn classify(&self, command: &str) -> Verdict {
        let line = collapse_whitespace(command);
        let subs = split_command(command);

        let mut verdict: Option<Verdict> = None;
        let mut fold = |next: Verdict| {
            verdict = Some(match verdict.take() {
                Some(current) => current.escalate(next),
                None => next,
            });
        };

        for rule in self.store.whole_command_rules() {
            if rule.matches_command_line(&line) {
                fold(rule_verdict(rule, &line));
            }
        }

        if subs.is_empty() {
            fold(self.default_verdict("empty command"));
        }
        for sub in &subs {
            fold(self.classify_sub(sub));
        }

        verdict.unwrap_or_else(|| self.default_verdict("empty command"))
    }

    fn classify_sub(&self, sub: &SubCommand) -> Verdict {
        let decided = match self.store.decisive_rule(sub) {
            Some(rule) => rule_verdict(rule, &sub.text),
            None => self.default_verdict(&format!("no rule matches `{}`", sub.text)),
        };

        if decided.kind == VerdictKind::Allow {
            if let Some(rule) = self.store.confirm_rule(sub) {
                return Verdict::ask_user(
                    Some(matched(rule, &sub.text)),
                    format!("`{}` requires confirmation (rule {})", sub.text, rule.id),
                );
            }
        }
        decided
    }

    fn default_verdict(&self, reason: &str) -> Verdict {
        let kind = self.store.default_verdict();
        Verdict {
            kind,
            rule: None,
            reason: format!("{reason}; default verdict is {kind}"),
        }
    }
}

fn matched(rule: &Rule, text: &str) -> MatchedRule {
    MatchedRule {
        id: rule.id.clone(),
        pattern: rule.pattern.clone(),
        matched: Some(text.to_string()),
    }
}

fn rule_verdict(rule: &Rule, text: &str) -> Verdict {
    let detail = rule
        .note
        .clone()
        .unwrap_or_else(|| format!("matches `{}`", rule.pattern));
    let kind = rule.verdict_kind();
    let reason = match kind {
        VerdictKind::Allow => format!("`{text}` allowed by rule {}: {detail}", rule.id),
        VerdictKind::AskUser => format!("`{text}` needs confirmation (rule {}): {detail}", rule.id),
        VerdictKind::Deny => format!("`{text}` denied by rule {}: {detail}", rule.id),
    };
    Verdict {
        kind,
        rule: Some(matched(rule, text)),
        reason,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
