//! Built-in rules.
//!
//! Core rules deny commands that can destroy the host. They are always
//! loaded and configuration can neither disable nor shadow them. Standard
//! rules provide a conservative baseline (confirm risky operations, allow
//! read-only ones) and may be replaced by an operator rule with the same id
//! or dropped with `policy.includeBuiltinRules = false`.
//!
//! ## Core rules
//! - `core.rm-root`: recursive delete of `/`, `/*`, `~`, or `$HOME`
//! - `core.fork-bomb`: `:(){ :|:& };:`
//! - `core.mkfs`: filesystem creation
//! - `core.dd-device`: `dd` onto a block device
//! - `core.device-redirect`: shell redirect onto a block device
//! - `core.chmod-root`: recursive `chmod 777 /`
//! - `core.pipe-to-shell`: `curl`/`wget` piped into a shell
//! - `core.force-push-protected`: force push to `main`/`master`
//! - `core.warden-config`: shell writes into a `.warden` directory

use warden_settings::{RuleConfig, RuleVerdict};

use crate::rules::RuleTier;

/// IDs of all core rules.
pub const CORE_RULE_IDS: &[&str] = &[
    "core.rm-root",
    "core.fork-bomb",
    "core.mkfs",
    "core.dd-device",
    "core.device-redirect",
    "core.chmod-root",
    "core.pipe-to-shell",
    "core.force-push-protected",
    "core.warden-config",
];

/// Check if a rule ID is a core rule.
pub fn is_core_rule(rule_id: &str) -> bool {
    CORE_RULE_IDS.contains(&rule_id)
}

/// A built-in rule definition.
#[derive(Debug, Clone)]
pub struct BuiltinRule {
    /// Rule definition.
    pub config: RuleConfig,
    /// Core or standard.
    pub tier: RuleTier,
    /// Matched against the whole command line rather than each sub-command.
    pub whole_command: bool,
}

const BLOCK_DEVICES: &str = "(?:sd|hd|nvme|xvd|vd|disk|mmcblk)";

fn core(id: &str, pattern: &str, note: &str) -> BuiltinRule {
    BuiltinRule {
        config: RuleConfig::regex(id, pattern, RuleVerdict::Deny).with_note(note),
        tier: RuleTier::Core,
        whole_command: false,
    }
}

fn core_anywhere(id: &str, pattern: &str, note: &str) -> BuiltinRule {
    BuiltinRule {
        whole_command: true,
        ..core(id, pattern, note)
    }
}

fn standard(config: RuleConfig) -> BuiltinRule {
    BuiltinRule {
        config,
        tier: RuleTier::Standard,
        whole_command: false,
    }
}

/// Core rules only.
pub fn core_rules() -> Vec<BuiltinRule> {
    vec![
        core(
            "core.rm-root",
            r"rm\s+(?:-\S*\s+)*-\S*[rR]\S*\s+(?:-\S+\s+)*(?:/\*?|~/?|\$HOME/?)(?:\s|$)",
            "recursive delete of the root or home directory",
        ),
        core_anywhere(
            "core.fork-bomb",
            r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
            "fork bomb",
        ),
        core("core.mkfs", r"mkfs(?:\.\w+)?(?:\s|$)", "creates a filesystem"),
        core(
            "core.dd-device",
            &format!(r"dd\s+(?:.*\s)?of=/dev/{BLOCK_DEVICES}"),
            "writes raw data onto a block device",
        ),
        core_anywhere(
            "core.device-redirect",
            &format!(r">\s*/dev/{BLOCK_DEVICES}"),
            "redirects output onto a block device",
        ),
        core(
            "core.chmod-root",
            r"chmod\s+(?:-\S+\s+)*-\S*R\S*\s+(?:-\S+\s+)*0?777\s+/(?:\s|$)",
            "makes the whole filesystem world-writable",
        ),
        core_anywhere(
            "core.pipe-to-shell",
            r"\b(?:curl|wget)\b[^|;&]*\|\s*(?:sudo\s+)?(?:ba|z|da|k)?sh\b",
            "executes a downloaded script",
        ),
        core(
            "core.force-push-protected",
            r"git\s+push\b.*\s(?:--force|-f)(?:\s.*)?\s(?:main|master)(?:\s|$)|git\s+push\b.*\s(?:main|master)\s(?:.*\s)?(?:--force|-f)(?:\s|$)",
            "force push to a protected branch",
        ),
        core_anywhere(
            "core.warden-config",
            r#"(?:>{1,2}\s*|\b(?:tee|cp|mv|ln|rm|truncate|install)\b[^|;&]*\s|\bsed\s+(?:[^|;&]*\s)?-i\S*[^|;&]*\s)['"]?\S*\.warden(?:/|['"\s]|$)"#,
            "modifies warden's own settings or state",
        ),
    ]
}

/// Standard (replaceable) rules.
pub fn standard_rules() -> Vec<BuiltinRule> {
    let ask = |id: &str, prefix: &str, note: &str| {
        standard(RuleConfig::prefix(id, prefix, RuleVerdict::Ask).with_note(note))
    };
    let ask_re = |id: &str, pattern: &str, note: &str| {
        standard(RuleConfig::regex(id, pattern, RuleVerdict::Ask).with_note(note))
    };
    let allow = |id: &str, prefix: &str| {
        standard(RuleConfig::prefix(id, prefix, RuleVerdict::Allow).with_note("read-only command"))
    };

    vec![
        ask("std.rm-rf", "rm -rf", "recursive forced delete"),
        ask("std.rm-fr", "rm -fr", "recursive forced delete"),
        ask("std.rm-r", "rm -r", "recursive delete"),
        ask("std.sudo", "sudo", "runs with elevated privileges"),
        ask("std.git-reset-hard", "git reset --hard", "discards uncommitted work"),
        ask_re("std.git-clean", r"git\s+clean\s+-\S*f", "deletes untracked files"),
        ask_re(
            "std.git-push-force",
            r"git\s+push\b.*\s(?:--force|-f)(?:\s|$)",
            "rewrites remote history",
        ),
        ask_re("std.chmod-777", r"chmod\s+(?:-\S+\s+)*0?777\b", "world-writable permissions"),
        ask_re("std.find-delete", r"find\b.*\s-delete\b", "bulk delete"),
        ask("std.killall", "killall", "kills processes by name"),
        ask("std.pkill", "pkill", "kills processes by pattern"),
        allow("std.ls", "ls"),
        allow("std.pwd", "pwd"),
        allow("std.cat", "cat"),
        allow("std.head", "head"),
        allow("std.tail", "tail"),
        allow("std.wc", "wc"),
        allow("std.echo", "echo"),
        allow("std.grep", "grep"),
        allow("std.rg", "rg"),
        allow("std.which", "which"),
        allow("std.find", "find"),
        allow("std.git-status", "git status"),
        allow("std.git-diff", "git diff"),
        allow("std.git-log", "git log"),
        allow("std.git-show", "git show"),
        allow("std.git-branch", "git branch"),
    ]
}

/// All built-in rules: core first, then standard.
pub fn builtin_rules() -> Vec<BuiltinRule> {
    let mut rules = core_rules();
    rules.extend(standard_rules());
    rules
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
