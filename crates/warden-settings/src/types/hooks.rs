//! Hook runtime and logging settings.

use serde::{Deserialize, Serialize};

/// Hook engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookSettings {
    /// Per-handler timeout in milliseconds.
    pub handler_timeout_ms: u64,
    /// Prompt keywords that signal the user is wrapping up the session.
    pub finish_keywords: Vec<String>,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            handler_timeout_ms: 10_000,
            finish_keywords: [
                "done",
                "finish",
                "finished",
                "complete",
                "wrap up",
                "end session",
                "that's all",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
