//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]`. Each type implements
//! [`Default`] with production values, and `#[serde(default)]` lets a
//! settings file name only the fields it changes.

mod budget;
mod commit;
mod continuity;
mod hooks;
mod policy;
mod scanner;

pub use budget::*;
pub use commit::*;
pub use continuity::*;
pub use hooks::*;
pub use policy::*;
pub use scanner::*;

use serde::{Deserialize, Serialize};

/// Root settings document.
///
/// ```json
/// {
///   "policy": { "rules": [{ "id": "npm-test", "pattern": "npm test", "verdict": "allow" }] },
///   "budget": { "sessionLimit": 200000 }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WardenSettings {
    /// Settings schema version.
    pub version: String,
    /// Command policy rules.
    pub policy: PolicySettings,
    /// Token budget.
    pub budget: BudgetSettings,
    /// Changed-file scanner.
    pub scanner: ScannerSettings,
    /// Commit validation.
    pub commit: CommitSettings,
    /// Session continuity pipeline.
    pub continuity: ContinuitySettings,
    /// Hook runtime.
    pub hooks: HookSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl Default for WardenSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            policy: PolicySettings::default(),
            budget: BudgetSettings::default(),
            scanner: ScannerSettings::default(),
            commit: CommitSettings::default(),
            continuity: ContinuitySettings::default(),
            hooks: HookSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_defaults() {
        let s: WardenSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s.version, "0.1.0");
        assert_eq!(s.budget.session_limit, 180_000);
        assert_eq!(s.policy.default_verdict, RuleVerdict::Ask);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(WardenSettings::default()).unwrap();
        assert!(json["budget"].get("sessionLimit").is_some());
        assert!(json["continuity"].get("summarizerTimeoutSecs").is_some());
        assert!(json["policy"].get("includeBuiltinRules").is_some());
    }
}
