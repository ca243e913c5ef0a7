//! Rule store.
//!
//! Loads, validates, and indexes rules. Rules are kept sorted by
//! specificity (descending); at equal specificity Deny sorts before Ask
//! before Allow, then load order decides. The store is immutable once
//! built; a new session builds a new store.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::debug;
use warden_core::verdict::VerdictKind;
use warden_settings::{PolicySettings, RuleConfig, RuleVerdict};

use crate::builtin::{BuiltinRule, core_rules, is_core_rule, standard_rules};
use crate::errors::{PolicyError, Result};
use crate::rules::{Rule, RuleTier};
use crate::split::SubCommand;

/// Indexed, immutable rule set.
pub struct RuleStore {
    rules: Vec<Rule>,
    by_id: HashMap<String, usize>,
    default_verdict: VerdictKind,
}

impl RuleStore {
    /// Build a store from policy settings: core rules, then (optionally)
    /// standard rules, then operator rules.
    ///
    /// An operator rule with a standard rule's id replaces it. An operator
    /// rule with a core rule's id is an error.
    pub fn from_settings(settings: &PolicySettings) -> Result<Self> {
        let mut builtins = core_rules();
        if settings.include_builtin_rules {
            builtins.extend(standard_rules());
        }
        Self::build(builtins, &settings.rules, settings.default_verdict)
    }

    /// Build a store from operator rules only (core rules are still loaded).
    pub fn with_rules(rules: &[RuleConfig], default_verdict: RuleVerdict) -> Result<Self> {
        Self::build(core_rules(), rules, default_verdict)
    }

    fn build(
        builtins: Vec<BuiltinRule>,
        custom: &[RuleConfig],
        default_verdict: RuleVerdict,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for config in custom {
            if is_core_rule(&config.id) {
                return Err(PolicyError::CoreRuleProtected {
                    rule_id: config.id.clone(),
                });
            }
            if !seen.insert(config.id.as_str()) {
                return Err(PolicyError::DuplicateRule {
                    rule_id: config.id.clone(),
                });
            }
        }

        let mut rules = Vec::with_capacity(builtins.len() + custom.len());
        for builtin in builtins {
            if seen.contains(builtin.config.id.as_str()) {
                debug!(rule_id = %builtin.config.id, "standard rule replaced by operator rule");
                continue;
            }
            let order = rules.len();
            let rule = if builtin.whole_command {
                Rule::compile_whole_command(&builtin.config, builtin.tier, order)?
            } else {
                Rule::compile(&builtin.config, builtin.tier, order)?
            };
            rules.push(rule);
        }
        for config in custom {
            let order = rules.len();
            rules.push(Rule::compile(config, RuleTier::Custom, order)?);
        }

        rules.sort_by_key(|r| {
            (
                std::cmp::Reverse(r.specificity()),
                std::cmp::Reverse(r.verdict_kind()),
                r.order,
            )
        });
        let by_id = rules
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        let store = Self {
            rules,
            by_id,
            default_verdict: match default_verdict {
                RuleVerdict::Allow => VerdictKind::Allow,
                RuleVerdict::Ask => VerdictKind::AskUser,
                RuleVerdict::Deny => VerdictKind::Deny,
            },
        };
        debug!(rule_count = store.len(), default = %store.default_verdict, "RuleStore loaded");
        Ok(store)
    }

    /// All rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by id.
    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.by_id.get(rule_id).map(|&i| &self.rules[i])
    }

    /// Verdict for sub-commands no rule matches.
    pub fn default_verdict(&self) -> VerdictKind {
        self.default_verdict
    }

    /// Number of loaded rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the store holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule that decides a sub-command.
    ///
    /// A matching core rule always decides. Otherwise the most specific
    /// matching rule decides, with Deny > Ask > Allow on ties.
    pub fn decisive_rule(&self, sub: &SubCommand) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.tier == RuleTier::Core && r.matches(sub))
            .or_else(|| self.rules.iter().find(|r| r.matches(sub)))
    }

    /// First `always-confirm` rule matching a sub-command.
    pub fn confirm_rule(&self, sub: &SubCommand) -> Option<&Rule> {
        self.rules
            .iter()
            .find(|r| r.always_confirm() && r.matches(sub))
    }

    /// Rules matched against the whole command line.
    pub fn whole_command_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.whole_command)
    }
}

impl fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleStore")
            .field("rule_count", &self.rules.len())
            .field("default_verdict", &self.default_verdict)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
