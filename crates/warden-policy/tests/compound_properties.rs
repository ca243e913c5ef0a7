//! Escalation properties of compound commands.

use proptest::prelude::*;
use warden_core::verdict::VerdictKind;
use warden_core::SessionContext;
use warden_policy::{CommandPolicyEngine, RuleStore};
use warden_settings::{RuleConfig, RuleVerdict};

fn engine() -> CommandPolicyEngine {
    let rules = vec![
        RuleConfig::prefix("deny-rm-rf", "rm -rf", RuleVerdict::Deny),
        RuleConfig::prefix("deny-drop", "psql -c drop", RuleVerdict::Deny),
        RuleConfig::prefix("ask-push", "git push", RuleVerdict::Ask),
        RuleConfig::prefix("allow-ls", "ls", RuleVerdict::Allow),
        RuleConfig::prefix("allow-pwd", "pwd", RuleVerdict::Allow),
        RuleConfig::prefix("allow-cargo", "cargo test", RuleVerdict::Allow),
    ];
    CommandPolicyEngine::new(RuleStore::with_rules(&rules, RuleVerdict::Ask).unwrap())
}

fn allowed() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ls".to_string()),
        Just("ls -la".to_string()),
        Just("pwd".to_string()),
        Just("cargo test --all".to_string()),
    ]
}

fn denied() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("rm -rf /tmp/x".to_string()),
        Just("rm -rf build".to_string()),
        Just("psql -c drop".to_string()),
    ]
}

fn operator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(" && "), Just("; "), Just(" | "), Just(" || ")]
}

proptest! {
    #[test]
    fn any_denied_part_denies_whole(
        before in proptest::collection::vec(allowed(), 0..3),
        deny in denied(),
        after in proptest::collection::vec(allowed(), 0..3),
        op in operator(),
    ) {
        let mut parts = before;
        parts.push(deny);
        parts.extend(after);
        let command = parts.join(op);
        prop_assert_eq!(engine().classify(&command).kind, VerdictKind::Deny);
    }

    #[test]
    fn ask_part_without_deny_asks(
        parts in proptest::collection::vec(allowed(), 1..4),
        op in operator(),
    ) {
        let mut parts = parts;
        parts.push("git push origin topic".to_string());
        let command = parts.join(op);
        prop_assert_eq!(engine().classify(&command).kind, VerdictKind::AskUser);
    }

    #[test]
    fn only_allowed_parts_allow(
        parts in proptest::collection::vec(allowed(), 1..5),
        op in operator(),
    ) {
        let command = parts.join(op);
        prop_assert_eq!(engine().classify(&command).kind, VerdictKind::Allow);
    }
}

#[test]
fn documented_example() {
    let ctx = SessionContext::new("s1", "/work");
    let verdict = engine().evaluate("rm -rf /tmp/x && ls", &ctx);
    assert_eq!(verdict.kind, VerdictKind::Deny);
}

#[test]
fn default_configuration_never_silently_allows_unknown() {
    let engine =
        CommandPolicyEngine::from_settings(&warden_settings::PolicySettings::default(), None)
            .unwrap();
    let verdict = engine.classify("some-unknown-tool --flag");
    assert_eq!(verdict.kind, VerdictKind::AskUser);
}
