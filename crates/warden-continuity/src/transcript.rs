//! Host interaction log model.
//!
//! The host writes one JSON record per line:
//!
//! ```json
//! {"type":"assistant","uuid":"…","timestamp":"2025-01-01T10:00:00Z",
//!  "message":{"role":"assistant","content":[{"type":"text","text":"…"}],
//!             "usage":{"input_tokens":10,"output_tokens":5}}}
//! ```
//!
//! Parsing is tolerant: unknown record types and block types are kept as
//! `Other`, and lines that are not JSON objects are skipped and counted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// User turn (including tool results returned to the model).
    User,
    /// Model turn.
    Assistant,
    /// Host system notice.
    System,
    /// Host-generated summary.
    Summary,
    /// Anything else (file-history snapshots, metadata).
    Other,
}

impl RecordKind {
    fn parse(s: &str) -> Self {
        match s {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "summary" => Self::Summary,
            _ => Self::Other,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Summary => "summary",
            Self::Other => "other",
        }
    }
}

/// One content block of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Plain text.
    Text(String),
    /// Model reasoning.
    Thinking(String),
    /// Tool invocation.
    ToolUse {
        /// Tool call id.
        id: String,
        /// Tool name.
        name: String,
        /// Tool arguments.
        input: Value,
    },
    /// Tool output.
    ToolResult {
        /// Id of the call this answers.
        tool_use_id: String,
        /// Flattened text output.
        content: String,
        /// Whether the tool reported failure.
        is_error: bool,
    },
    /// Image payload (dropped when refining).
    Image,
    /// Unknown block type.
    Other,
}

/// Token usage reported on assistant records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
    /// Prompt tokens served from cache.
    pub cache_read_input_tokens: u64,
    /// Prompt tokens written to cache.
    pub cache_creation_input_tokens: u64,
}

impl Usage {
    /// All tokens of the turn.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.input_tokens
            .saturating_add(self.output_tokens)
            .saturating_add(self.cache_read_input_tokens)
            .saturating_add(self.cache_creation_input_tokens)
    }
}

/// One parsed record.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    /// Record type.
    pub kind: RecordKind,
    /// Host record id.
    pub uuid: Option<String>,
    /// When the record was written.
    pub timestamp: Option<DateTime<Utc>>,
    /// Content blocks (a string body becomes one `Text` block).
    pub content: Vec<ContentBlock>,
    /// Usage, when reported.
    pub usage: Option<Usage>,
}

impl TranscriptRecord {
    /// Joined text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether this is a user record carrying only tool results.
    #[must_use]
    pub fn is_tool_result_only(&self) -> bool {
        !self.content.is_empty()
            && self
                .content
                .iter()
                .all(|b| matches!(b, ContentBlock::ToolResult { .. }))
    }
}

/// Aggregate statistics of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotStatistics {
    /// Records parsed.
    pub total_records: usize,
    /// Records per type.
    pub by_kind: BTreeMap<String, usize>,
    /// Tool invocations.
    pub tool_calls: usize,
    /// Tokens reported across assistant turns.
    pub total_tokens: u64,
    /// Earliest timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_timestamp: Option<DateTime<Utc>>,
    /// Latest timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Seconds between first and last record.
    pub duration_secs: i64,
    /// Lines that could not be parsed.
    pub skipped_lines: usize,
}

/// A parsed interaction log.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Records in log order.
    pub records: Vec<TranscriptRecord>,
    /// Lines skipped as malformed.
    pub skipped: usize,
}

impl Transcript {
    /// Parse JSONL text.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut transcript = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) if value.is_object() => transcript.records.push(parse_record(&value)),
                _ => transcript.skipped += 1,
            }
        }
        transcript
    }

    /// Whether no records were parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot statistics.
    #[must_use]
    pub fn statistics(&self) -> SnapshotStatistics {
        let mut stats = SnapshotStatistics {
            total_records: self.records.len(),
            skipped_lines: self.skipped,
            ..SnapshotStatistics::default()
        };
        for record in &self.records {
            *stats.by_kind.entry(record.kind.label().to_string()).or_insert(0) += 1;
            stats.tool_calls += record
                .content
                .iter()
                .filter(|b| matches!(b, ContentBlock::ToolUse { .. }))
                .count();
            if let Some(usage) = record.usage {
                stats.total_tokens = stats.total_tokens.saturating_add(usage.total());
            }
            if let Some(ts) = record.timestamp {
                stats.first_timestamp = Some(stats.first_timestamp.map_or(ts, |f| f.min(ts)));
                stats.last_timestamp = Some(stats.last_timestamp.map_or(ts, |l| l.max(ts)));
            }
        }
        if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
            stats.duration_secs = (last - first).num_seconds();
        }
        stats
    }
}

fn parse_record(value: &Value) -> TranscriptRecord {
    let kind = RecordKind::parse(value.get("type").and_then(Value::as_str).unwrap_or(""));
    let message = value.get("message");
    let content = match message.and_then(|m| m.get("content")) {
        Some(c) => parse_content(c),
        None => value
            .get("summary")
            .and_then(Value::as_str)
            .map(|s| vec![ContentBlock::Text(s.to_string())])
            .unwrap_or_default(),
    };
    let usage = message
        .and_then(|m| m.get("usage"))
        .or_else(|| value.get("usage"))
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok());
    TranscriptRecord {
        kind,
        uuid: value.get("uuid").and_then(Value::as_str).map(str::to_string),
        timestamp: value
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        content,
        usage,
    }
}

fn parse_content(content: &Value) -> Vec<ContentBlock> {
    match content {
        Value::String(s) => vec![ContentBlock::Text(s.clone())],
        Value::Array(blocks) => blocks.iter().map(parse_block).collect(),
        _ => Vec::new(),
    }
}

fn parse_block(block: &Value) -> ContentBlock {
    let str_field = |key: &str| {
        block
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    match block.get("type").and_then(Value::as_str) {
        Some("text") => ContentBlock::Text(str_field("text")),
        Some("thinking") => ContentBlock::Thinking(str_field("thinking")),
        Some("tool_use") => ContentBlock::ToolUse {
            id: str_field("id"),
            name: str_field("name"),
            input: block.get("input").cloned().unwrap_or(Value::Null),
        },
        Some("tool_result") => ContentBlock::ToolResult {
            tool_use_id: str_field("tool_use_id"),
            content: flatten_result(block.get("content")),
            is_error: block
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        Some("image") => ContentBlock::Image,
        _ => ContentBlock::Other,
    }
}

fn flatten_result(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item.get("type").and_then(Value::as_str) {
                Some("text") => item.get("text").and_then(Value::as_str).map(str::to_string),
                Some("image") => Some("[image]".to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}
