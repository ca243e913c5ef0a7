//! # warden-settings
//!
//! Layered configuration for the warden hook layer.
//!
//! Settings are loaded from four layers (in priority order):
//! 1. **Compiled defaults**: [`WardenSettings::default()`]
//! 2. **User file**: `~/.warden/settings.json`
//! 3. **Project file**: `<cwd>/.warden/settings.json`
//! 4. **Environment variables**: `WARDEN_*` overrides (highest priority)
//!
//! The merged document is validated before use: rule ids must be unique,
//! every pattern must compile, and limits must be positive.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;
pub mod validate;

pub use errors::{Result, SettingsError};
pub use loader::{load_settings, load_settings_from_paths, settings_path, settings_paths};
pub use types::*;
pub use validate::validate_settings;

use std::path::Path;
use std::sync::OnceLock;

/// Process-wide settings, initialized once per hook invocation.
static SETTINGS: OnceLock<WardenSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings for `cwd`. If loading fails the error is
/// logged and compiled defaults are used, which keeps every gate at its
/// conservative default.
pub fn get_settings(cwd: &Path) -> &'static WardenSettings {
    SETTINGS.get_or_init(|| {
        load_settings(cwd).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            WardenSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: WardenSettings) -> std::result::Result<(), WardenSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = WardenSettings::default();
        let _path = settings_path();
        let _rule = RuleConfig::prefix("ls", "ls", RuleVerdict::Allow);
    }

    #[test]
    fn default_settings_snapshot() {
        let json = serde_json::to_value(WardenSettings::default()).unwrap();
        insta::assert_json_snapshot!(json["budget"], @r#"
        {
          "criticalRatio": 0.9,
          "enabled": true,
          "sessionLimit": 180000,
          "totalLimit": 500000,
          "warningRatio": 0.75
        }
        "#);
    }
}
