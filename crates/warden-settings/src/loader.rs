//! Layered settings loading.
//!
//! Loading flow:
//! 1. Start with compiled [`WardenSettings::default()`]
//! 2. Merge `~/.warden/settings.json` (user scope)
//! 3. Merge `<cwd>/.warden/settings.json` (project scope)
//! 4. Apply `WARDEN_*` environment variable overrides (highest priority)
//! 5. Validate
//!
//! Objects merge per key; arrays and primitives are replaced by the later
//! layer.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Json, Serialized};
use tracing::debug;
use warden_core::paths::warden_home;

use crate::errors::Result;
use crate::types::{RuleVerdict, WardenSettings};
use crate::validate::validate_settings;

/// Project-level settings location, relative to the working directory.
pub const PROJECT_SETTINGS: &str = ".warden/settings.json";

/// Resolve the user settings file (`$WARDEN_HOME/settings.json`).
pub fn settings_path() -> PathBuf {
    warden_home().join("settings.json")
}

/// Settings files consulted for a session rooted at `cwd`, lowest priority first.
pub fn settings_paths(cwd: &Path) -> Vec<PathBuf> {
    vec![settings_path(), cwd.join(PROJECT_SETTINGS)]
}

/// Load settings for a working directory with env var overrides.
pub fn load_settings(cwd: &Path) -> Result<WardenSettings> {
    load_settings_from_paths(&settings_paths(cwd))
}

/// Load settings from explicit files (lowest priority first).
///
/// Missing files are skipped. Invalid JSON, mistyped values, and failed
/// validation are errors.
pub fn load_settings_from_paths(paths: &[PathBuf]) -> Result<WardenSettings> {
    let mut figment = Figment::from(Serialized::defaults(WardenSettings::default()));
    for path in paths {
        if path.exists() {
            debug!(?path, "merging settings file");
            figment = figment.merge(Json::file(path));
        } else {
            debug!(?path, "settings file not found, skipping");
        }
    }

    let mut settings: WardenSettings = figment.extract()?;
    apply_env_overrides(&mut settings);
    validate_settings(&settings)?;
    Ok(settings)
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are warned about and ignored (falling back to
/// file/default values).
pub fn apply_env_overrides(settings: &mut WardenSettings) {
    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("WARDEN_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("WARDEN_LOG_JSON") {
        settings.logging.json = v;
    }

    // ── Policy ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("WARDEN_DEFAULT_VERDICT") {
        match parse_verdict(&v) {
            Some(verdict) => settings.policy.default_verdict = verdict,
            None => {
                tracing::warn!(key = "WARDEN_DEFAULT_VERDICT", value = %v, "invalid verdict env var, ignoring");
            }
        }
    }

    // ── Budget ──────────────────────────────────────────────────────
    if let Some(v) = read_env_bool("WARDEN_BUDGET_ENABLED") {
        settings.budget.enabled = v;
    }
    if let Some(v) = read_env_u64("WARDEN_SESSION_TOKEN_LIMIT", 1, u64::MAX) {
        settings.budget.session_limit = v;
    }

    // ── Scanner ─────────────────────────────────────────────────────
    if let Some(v) = read_env_bool("WARDEN_UNFINISHED_BLOCKING") {
        settings.scanner.unfinished_blocking = v;
    }

    // ── Continuity ──────────────────────────────────────────────────
    if let Some(v) = read_env_bool("WARDEN_CONTINUITY_ENABLED") {
        settings.continuity.enabled = v;
    }
    if let Some(v) = read_env_bool("WARDEN_CONTINUITY_DETACH") {
        settings.continuity.detach = v;
    }
    if let Some(v) = read_env_u64("WARDEN_SUMMARIZER_TIMEOUT_SECS", 1, 3600) {
        settings.continuity.summarizer_timeout_secs = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a verdict name (`allow` / `ask` / `deny`).
pub fn parse_verdict(val: &str) -> Option<RuleVerdict> {
    match val.to_lowercase().as_str() {
        "allow" => Some(RuleVerdict::Allow),
        "ask" | "askuser" => Some(RuleVerdict::Ask),
        "deny" => Some(RuleVerdict::Deny),
        _ => None,
    }
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
