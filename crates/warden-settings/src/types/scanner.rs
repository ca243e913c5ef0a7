//! Artifact scanner settings.

use serde::{Deserialize, Serialize};

/// Additional credential pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretPatternConfig {
    /// Detector name reported in findings.
    pub id: String,
    /// Regex source.
    pub pattern: String,
}

/// Project-specific forbidden code pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForbiddenPatternConfig {
    /// Pattern identifier.
    pub id: String,
    /// Regex source.
    pub pattern: String,
    /// Message shown with the finding.
    pub message: String,
    /// Whether a match blocks the action.
    #[serde(default)]
    pub blocking: bool,
    /// File globs the pattern applies to (empty = all files).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub globs: Vec<String>,
}

/// Scanner configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScannerSettings {
    /// Run the credential pass.
    pub secret_detection: bool,
    /// Patterns added to the built-in credential detectors.
    pub extra_secret_patterns: Vec<SecretPatternConfig>,
    /// Run the unfinished-work pass.
    pub unfinished_detection: bool,
    /// Literal markers that indicate unfinished work.
    pub unfinished_markers: Vec<String>,
    /// Whether unfinished markers block instead of advise.
    pub unfinished_blocking: bool,
    /// Skip the unfinished-work and forbidden-pattern passes on test files.
    pub skip_test_files: bool,
    /// Globs identifying test files.
    pub test_globs: Vec<String>,
    /// Globs never scanned at all.
    pub ignore_globs: Vec<String>,
    /// Project-specific forbidden code patterns.
    pub forbidden_patterns: Vec<ForbiddenPatternConfig>,
    /// Flag dates far in the past or future.
    pub check_timestamps: bool,
    /// Oldest acceptable date, in days before today.
    pub timestamp_past_days: i64,
    /// Newest acceptable date, in days after today.
    pub timestamp_future_days: i64,
    /// Files larger than this are skipped.
    pub max_file_bytes: u64,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            secret_detection: true,
            extra_secret_patterns: Vec::new(),
            unfinished_detection: true,
            unfinished_markers: [
                "TODO",
                "FIXME",
                "XXX",
                "HACK",
                "todo!(",
                "unimplemented!(",
                "NotImplementedError",
                "not implemented",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            unfinished_blocking: false,
            skip_test_files: true,
            test_globs: [
                "**/tests/**",
                "**/test/**",
                "**/test_*.py",
                "**/*_test.*",
                "**/*.test.*",
                "**/*.spec.*",
                "**/conftest.py",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            ignore_globs: ["**/.git/**", "**/target/**", "**/node_modules/**"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            forbidden_patterns: Vec::new(),
            check_timestamps: false,
            timestamp_past_days: 365,
            timestamp_future_days: 30,
            max_file_bytes: 2 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ScannerSettings::default();
        assert!(s.secret_detection);
        assert!(!s.unfinished_blocking);
        assert!(s.unfinished_markers.iter().any(|m| m == "TODO"));
        assert!(!s.check_timestamps);
    }

    #[test]
    fn forbidden_pattern_minimal() {
        let p: ForbiddenPatternConfig = serde_json::from_str(
            r#"{"id":"getattr","pattern":"\\bgetattr\\s*\\(","message":"no dynamic access"}"#,
        )
        .unwrap();
        assert!(!p.blocking);
        assert!(p.globs.is_empty());
    }
}
