//! Session continuity pipeline settings.

use serde::{Deserialize, Serialize};

/// Continuity pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContinuitySettings {
    /// Whether the pipeline runs on compaction / session end.
    pub enabled: bool,
    /// Summarizer process argv; the prompt is written to its stdin.
    pub summarizer_command: Vec<String>,
    /// Summarizer timeout in seconds.
    pub summarizer_timeout_secs: u64,
    /// Longest summary kept, in characters.
    pub max_summary_chars: usize,
    /// Conversational records kept verbatim at the tail of the excerpt.
    pub keep_recent: usize,
    /// Hard ceiling on the rendered excerpt, in bytes.
    pub max_excerpt_bytes: usize,
    /// Assistant text truncation, in characters.
    pub assistant_text_limit: usize,
    /// Tool result truncation, in characters.
    pub tool_result_limit: usize,
    /// Briefs older than this are not injected.
    pub brief_max_age_hours: u64,
    /// Snapshots retained per session.
    pub max_snapshots: usize,
    /// Briefs retained in history.
    pub max_briefs: usize,
    /// Run the pipeline as a detached child process.
    pub detach: bool,
}

impl Default for ContinuitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            summarizer_command: ["claude", "-p", "--output-format", "json"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            summarizer_timeout_secs: 180,
            max_summary_chars: 5000,
            keep_recent: 10,
            max_excerpt_bytes: 200_000,
            assistant_text_limit: 300,
            tool_result_limit: 100,
            brief_max_age_hours: 12,
            max_snapshots: 3,
            max_briefs: 20,
            detach: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ContinuitySettings::default();
        assert_eq!(c.summarizer_timeout_secs, 180);
        assert_eq!(c.keep_recent, 10);
        assert_eq!(c.summarizer_command[0], "claude");
    }
}
