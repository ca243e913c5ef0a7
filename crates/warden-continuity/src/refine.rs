//! Snapshot reduction.
//!
//! The refiner keeps what a fresh session needs to resume work: the
//! original task, explicit user corrections, the latest unresolved error,
//! open todo items, the set of files modified, and the last few turns with
//! bulky payloads truncated. Repeated tool output is collapsed by content
//! hash. The salient content is bounded and always smaller than its
//! snapshot; fixed metadata (session id, statistics) is not counted.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use warden_core::SessionId;
use warden_core::fs::{read_json_opt, write_json_atomic};
use warden_settings::ContinuitySettings;

use crate::errors::{ContinuityError, Result};
use crate::transcript::{ContentBlock, RecordKind, SnapshotStatistics, Transcript};

/// Tools whose `file_path` argument marks a file as modified.
const EDIT_TOOLS: &[&str] = &["Edit", "MultiEdit", "Write", "NotebookEdit"];

/// Phrases that mark a user turn as a correction or override.
const CORRECTION_CUES: &[&str] = &[
    "no,",
    "no.",
    "don't",
    "do not",
    "instead",
    "actually",
    "that's wrong",
    "not what i",
    "i said",
    "stop",
    "never",
    "always",
    "you should",
    "must not",
];

/// Any cue as a whole word or phrase, case-insensitive.
static CORRECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = CORRECTION_CUES
        .iter()
        .map(|cue| {
            let mut pattern = regex::escape(cue);
            if cue.chars().last().is_some_and(char::is_alphanumeric) {
                pattern.push_str(r"\b");
            }
            pattern
        })
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})", alternatives.join("|"))).unwrap()
});

const USER_TEXT_LIMIT: usize = 500;
const TASK_TEXT_LIMIT: usize = 1000;
const TOOL_ARG_LIMIT: usize = 100;
const MAX_CORRECTIONS: usize = 10;

/// Size limits for refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefineLimits {
    /// Conversational records kept verbatim (truncated).
    pub keep_recent: usize,
    /// Character cap for assistant text.
    pub assistant_text_limit: usize,
    /// Character cap for tool output.
    pub tool_result_limit: usize,
    /// Byte cap for the serialized excerpt.
    pub max_excerpt_bytes: usize,
}

impl From<&ContinuitySettings> for RefineLimits {
    fn from(s: &ContinuitySettings) -> Self {
        Self {
            keep_recent: s.keep_recent,
            assistant_text_limit: s.assistant_text_limit,
            tool_result_limit: s.tool_result_limit,
            max_excerpt_bytes: s.max_excerpt_bytes,
        }
    }
}

impl Default for RefineLimits {
    fn default() -> Self {
        Self::from(&ContinuitySettings::default())
    }
}

/// One retained turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcerptEntry {
    /// `user`, `assistant` or `summary`.
    pub role: String,
    /// Record time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Reduced text.
    pub text: String,
}

/// Salient subset of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedExcerpt {
    /// Session the snapshot belongs to.
    pub session_id: SessionId,
    /// First user request.
    pub task_statement: Option<String>,
    /// User corrections and overrides, oldest first.
    pub corrections: Vec<String>,
    /// Most recent tool error not followed by a success of the same tool.
    pub unresolved_error: Option<String>,
    /// Files modified during the session.
    pub touched_files: BTreeSet<String>,
    /// Incomplete todo items from the latest todo list.
    pub open_items: Vec<String>,
    /// Last conversational turns.
    pub recent: Vec<ExcerptEntry>,
    /// Snapshot statistics.
    pub statistics: SnapshotStatistics,
    /// Size of the source snapshot.
    pub snapshot_bytes: u64,
}

impl RefinedExcerpt {
    /// Serialized size in bytes.
    pub fn byte_len(&self) -> Result<usize> {
        Ok(serde_json::to_vec(self)?.len())
    }

    /// Bytes of salient text: task, corrections, error, files, open items
    /// and recent turns.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.task_statement.as_ref().map_or(0, String::len)
            + self.unresolved_error.as_ref().map_or(0, String::len)
            + self.corrections.iter().map(String::len).sum::<usize>()
            + self.touched_files.iter().map(String::len).sum::<usize>()
            + self.open_items.iter().map(String::len).sum::<usize>()
            + self.recent.iter().map(|e| e.role.len() + e.text.len()).sum::<usize>()
    }

    /// Persist as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).map_err(|e| ContinuityError::io(path, e))
    }

    /// Load a persisted excerpt.
    pub fn load(path: &Path) -> Result<Self> {
        read_json_opt(path)
            .map_err(|e| ContinuityError::io(path, e))?
            .ok_or_else(|| {
                ContinuityError::io(path, std::io::Error::from(std::io::ErrorKind::NotFound))
            })
    }

    /// Plain-text rendering used for the summarizer prompt and fallback briefs.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(task) = &self.task_statement {
            let _ = writeln!(out, "Task: {task}\n");
        }
        if !self.touched_files.is_empty() {
            let files: Vec<&str> = self.touched_files.iter().map(String::as_str).collect();
            let _ = writeln!(out, "Files modified: {}\n", files.join(", "));
        }
        if !self.open_items.is_empty() {
            out.push_str("Open items:\n");
            for item in &self.open_items {
                let _ = writeln!(out, "- {item}");
            }
            out.push('\n');
        }
        if let Some(error) = &self.unresolved_error {
            let _ = writeln!(out, "Latest unresolved error: {error}\n");
        }
        if !self.corrections.is_empty() {
            out.push_str("User corrections:\n");
            for c in &self.corrections {
                let _ = writeln!(out, "- {c}");
            }
            out.push('\n');
        }
        if !self.recent.is_empty() {
            out.push_str("Recent activity:\n");
            for entry in &self.recent {
                let when = entry
                    .timestamp
                    .map(|t| t.format(" %H:%M").to_string())
                    .unwrap_or_default();
                let _ = writeln!(out, "[{}{when}] {}", entry.role, entry.text);
            }
        }
        out.trim_end().to_string()
    }
}

/// Reduces snapshots to excerpts.
#[derive(Debug, Clone, Default)]
pub struct ContextRefiner {
    limits: RefineLimits,
}

impl ContextRefiner {
    /// Refiner with the given limits.
    #[must_use]
    pub fn new(limits: RefineLimits) -> Self {
        Self { limits }
    }

    /// Refine a snapshot file.
    pub fn refine_file(&self, session_id: &SessionId, snapshot: &Path) -> Result<RefinedExcerpt> {
        let text =
            std::fs::read_to_string(snapshot).map_err(|e| ContinuityError::io(snapshot, e))?;
        self.refine(session_id, &Transcript::parse(&text), text.len() as u64)
    }

    /// Refine a parsed snapshot of `snapshot_bytes` bytes.
    pub fn refine(
        &self,
        session_id: &SessionId,
        transcript: &Transcript,
        snapshot_bytes: u64,
    ) -> Result<RefinedExcerpt> {
        if transcript.is_empty() || snapshot_bytes == 0 {
            return Err(ContinuityError::EmptySnapshot);
        }

        let mut tool_names: HashMap<&str, &str> = HashMap::new();
        let mut seen_output: HashSet<Vec<u8>> = HashSet::new();
        let mut excerpt = RefinedExcerpt {
            session_id: session_id.clone(),
            task_statement: None,
            corrections: Vec::new(),
            unresolved_error: None,
            touched_files: BTreeSet::new(),
            open_items: Vec::new(),
            recent: Vec::new(),
            statistics: transcript.statistics(),
            snapshot_bytes,
        };
        let mut error_tool: Option<String> = None;
        let mut entries: Vec<ExcerptEntry> = Vec::new();

        for record in &transcript.records {
            if !matches!(
                record.kind,
                RecordKind::User | RecordKind::Assistant | RecordKind::Summary
            ) {
                continue;
            }

            if record.kind == RecordKind::User && !record.is_tool_result_only() {
                let text = record.text();
                let text = text.trim();
                if !text.is_empty() && !text.starts_with('<') {
                    if excerpt.task_statement.is_none() {
                        excerpt.task_statement = Some(truncate(text, TASK_TEXT_LIMIT));
                    } else if is_correction(text) {
                        excerpt.corrections.push(truncate(text, USER_TEXT_LIMIT));
                    }
                }
            }

            let mut parts: Vec<String> = Vec::new();
            for block in &record.content {
                match block {
                    ContentBlock::Text(text) if !text.trim().is_empty() => {
                        let limit = if record.kind == RecordKind::Assistant {
                            self.limits.assistant_text_limit
                        } else {
                            USER_TEXT_LIMIT
                        };
                        parts.push(truncate(text.trim(), limit));
                    }
                    ContentBlock::ToolUse { id, name, input } => {
                        let _ = tool_names.insert(id.as_str(), name.as_str());
                        if EDIT_TOOLS.contains(&name.as_str()) {
                            if let Some(path) = file_argument(input) {
                                let _ = excerpt.touched_files.insert(path);
                            }
                        }
                        if name == "TodoWrite" {
                            if let Some(items) = open_todos(input) {
                                excerpt.open_items = items;
                            }
                        }
                        parts.push(format!("[tool: {name}] {}", tool_argument(input)).trim_end().to_string());
                    }
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => {
                        let tool = tool_names
                            .get(tool_use_id.as_str())
                            .copied()
                            .unwrap_or("tool")
                            .to_string();
                        if *is_error {
                            excerpt.unresolved_error =
                                Some(format!("{tool}: {}", truncate(content.trim(), USER_TEXT_LIMIT)));
                            error_tool = Some(tool.clone());
                        } else if error_tool.as_deref() == Some(tool.as_str()) {
                            excerpt.unresolved_error = None;
                            error_tool = None;
                        }
                        let digest = Sha256::digest(content.as_bytes()).to_vec();
                        if seen_output.insert(digest) {
                            let label = if *is_error { "error" } else { "result" };
                            parts.push(format!(
                                "[{label}] {}",
                                truncate(content.trim(), self.limits.tool_result_limit)
                            ));
                        } else {
                            parts.push("[repeated output]".to_string());
                        }
                    }
                    ContentBlock::Image => parts.push("[image]".to_string()),
                    _ => {}
                }
            }
            if !parts.is_empty() {
                entries.push(ExcerptEntry {
                    role: match record.kind {
                        RecordKind::Assistant => "assistant",
                        RecordKind::Summary => "summary",
                        _ => "user",
                    }
                    .to_string(),
                    timestamp: record.timestamp,
                    text: parts.join(" "),
                });
            }
        }

        if excerpt.corrections.len() > MAX_CORRECTIONS {
            let excess = excerpt.corrections.len() - MAX_CORRECTIONS;
            let _ = excerpt.corrections.drain(..excess);
        }
        let skip = entries.len().saturating_sub(self.limits.keep_recent);
        excerpt.recent = entries.into_iter().skip(skip).collect();

        self.bound(&mut excerpt);
        info!(
            session_id = %session_id,
            snapshot_bytes,
            content_bytes = excerpt.content_len(),
            touched_files = excerpt.touched_files.len(),
            open_items = excerpt.open_items.len(),
            "snapshot refined"
        );
        Ok(excerpt)
    }

    /// Shrink the salient content until it fits both the byte cap and the
    /// snapshot size. Oldest turns go first, then corrections; the
    /// remaining fields are truncated rather than failing the run.
    fn bound(&self, excerpt: &mut RefinedExcerpt) {
        let snapshot = usize::try_from(excerpt.snapshot_bytes).unwrap_or(usize::MAX);
        let budget = self.limits.max_excerpt_bytes.min(snapshot.saturating_sub(1));

        while excerpt.content_len() > budget && !excerpt.recent.is_empty() {
            let _ = excerpt.recent.remove(0);
        }
        while excerpt.content_len() > budget && !excerpt.corrections.is_empty() {
            let _ = excerpt.corrections.remove(0);
        }
        if excerpt.content_len() > budget {
            excerpt.unresolved_error = None;
        }
        while excerpt.content_len() > budget && excerpt.open_items.len() > 1 {
            let _ = excerpt.open_items.pop();
        }
        while excerpt.content_len() > budget && excerpt.touched_files.len() > 1 {
            let _ = excerpt.touched_files.pop_last();
        }
        while excerpt.content_len() > budget {
            let Some(task) = excerpt.task_statement.take() else {
                excerpt.open_items.clear();
                excerpt.touched_files.clear();
                break;
            };
            let chars = task.chars().count();
            if chars > 1 {
                excerpt.task_statement = Some(task.chars().take(chars / 2).collect());
            }
        }
        debug!(content_bytes = excerpt.content_len(), budget, "excerpt bounded");
    }
}

fn is_correction(text: &str) -> bool {
    CORRECTION_RE.is_match(text)
}

fn file_argument(input: &Value) -> Option<String> {
    ["file_path", "notebook_path", "path"]
        .iter()
        .find_map(|key| input.get(*key).and_then(Value::as_str))
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

fn tool_argument(input: &Value) -> String {
    let arg = ["file_path", "command", "pattern", "path", "url", "description"]
        .iter()
        .find_map(|key| input.get(*key).and_then(Value::as_str))
        .unwrap_or_default();
    truncate(arg, TOOL_ARG_LIMIT)
}

fn open_todos(input: &Value) -> Option<Vec<String>> {
    let todos = input.get("todos")?.as_array()?;
    Some(
        todos
            .iter()
            .filter(|t| t.get("status").and_then(Value::as_str) != Some("completed"))
            .filter_map(|t| t.get("content").and_then(Value::as_str))
            .map(str::to_string)
            .collect(),
    )
}

/// Truncate to `limit` characters, marking the cut.
#[must_use]
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}…")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
