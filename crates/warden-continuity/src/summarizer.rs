//! Summarization backend.
//!
//! The backend is the only external call in the pipeline. It sits behind
//! the narrow [`Summarizer`] trait; [`summarize_with_timeout`] bounds it and
//! discards the result on timeout.

use std::fmt::Write as _;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};
use warden_core::SessionId;

use crate::errors::SummarizerError;
use crate::refine::RefinedExcerpt;

/// Leading stderr kept in error messages.
const STDERR_PREVIEW_CHARS: usize = 500;

/// Turns a prompt into summary prose.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `prompt`.
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError>;
}

/// Run `summarizer` with a deadline. The in-flight call is dropped on timeout.
pub async fn summarize_with_timeout(
    summarizer: &dyn Summarizer,
    prompt: &str,
    timeout: Duration,
) -> Result<String, SummarizerError> {
    match tokio::time::timeout(timeout, summarizer.summarize(prompt)).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "summarizer timed out");
            Err(SummarizerError::Timeout {
                secs: timeout.as_secs(),
            })
        }
    }
}

/// External process backend. The prompt goes to stdin; stdout is either a
/// JSON result envelope or plain text.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    program: String,
    args: Vec<String>,
}

impl CommandSummarizer {
    /// Backend running `command[0]` with the remaining arguments.
    pub fn new(command: &[String]) -> Result<Self, SummarizerError> {
        let (program, args) = command.split_first().ok_or(SummarizerError::NotConfigured)?;
        if program.trim().is_empty() {
            return Err(SummarizerError::NotConfigured);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl Summarizer for CommandSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, SummarizerError> {
        debug!(program = %self.program, prompt_chars = prompt.len(), "spawning summarizer");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .chars()
                .take(STDERR_PREVIEW_CHARS)
                .collect();
            return Err(SummarizerError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        parse_summarizer_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract summary text from backend stdout.
///
/// Accepts a JSON array of events (first `result` event, else the first
/// assistant text block), a single result object, or plain text.
pub fn parse_summarizer_output(stdout: &str) -> Result<String, SummarizerError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(SummarizerError::Empty("empty output".to_string()));
    }
    let text = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(events)) => events
            .iter()
            .find(|e| e.get("type").and_then(Value::as_str) == Some("result"))
            .map(result_text)
            .transpose()?
            .filter(|s| !s.is_empty())
            .or_else(|| {
                events
                    .iter()
                    .find(|e| e.get("type").and_then(Value::as_str) == Some("assistant"))
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.get("content"))
                    .map(content_text)
            })
            .unwrap_or_default(),
        Ok(object @ Value::Object(_)) => result_text(&object)?,
        Ok(Value::String(s)) => s,
        Ok(_) | Err(_) => trimmed.to_string(),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(SummarizerError::Empty("no text in output".to_string()));
    }
    Ok(text)
}

fn result_text(object: &Value) -> Result<String, SummarizerError> {
    if object.get("is_error").and_then(Value::as_bool) == Some(true) {
        let detail = object
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or("backend reported an error");
        return Err(SummarizerError::Empty(detail.to_string()));
    }
    if let Some(result) = object.get("result").and_then(Value::as_str) {
        return Ok(result.to_string());
    }
    Ok(object.get("content").map(content_text).unwrap_or_default())
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|b| b.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Fixed instruction template for the backend.
#[must_use]
pub fn build_prompt(session_id: &SessionId, excerpt: &RefinedExcerpt, max_chars: usize) -> String {
    let stats = &excerpt.statistics;
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Summarize the following coding session in at most {max_chars} characters so a new session can continue the work.\n"
    );
    let _ = writeln!(
        prompt,
        "Session: {session_id} | records: {} | tool calls: {} | duration: {} min\n",
        stats.total_records,
        stats.tool_calls,
        stats.duration_secs / 60
    );
    prompt.push_str(
        "Rules:\n\
         - Short bullet points only.\n\
         - Reference code as file:line, no code blocks.\n\
         - Drop background, repetition and pleasantries.\n\n\
         Use exactly these sections:\n\
         ## What was done\n\
         ## What remains\n\
         ## Constraints imposed\n\n\
         ---\n\n",
    );
    prompt.push_str(&excerpt.render());
    prompt.push('\n');
    prompt
}

/// Bullets under the first "remain" heading of a summary.
#[must_use]
pub fn parse_remaining_items(summary: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_section = false;
    for line in summary.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            if in_section {
                break;
            }
            in_section = trimmed.to_lowercase().contains("remain");
            continue;
        }
        if !in_section {
            continue;
        }
        let bullet = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
            .or_else(|| {
                let (num, rest) = trimmed.split_once(". ")?;
                num.chars().all(|c| c.is_ascii_digit()).then_some(rest)
            });
        if let Some(item) = bullet.map(str::trim).filter(|s| !s.is_empty()) {
            let item = item
                .strip_prefix("[ ] ")
                .unwrap_or(item)
                .to_string();
            items.push(item);
        }
    }
    items
}

/// Cap a summary at `max_chars` characters.
#[must_use]
pub fn cap_summary(summary: &str, max_chars: usize) -> String {
    crate::refine::truncate(summary.trim(), max_chars)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
