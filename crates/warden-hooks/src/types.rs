//! Hook events, host payloads and handler results.
//!
//! The host payload uses snake_case field names; everything warden writes
//! back uses camelCase.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use warden_core::{SessionContext, Verdict, VerdictKind};

use crate::errors::HookError;

/// Tools whose input carries a file write.
pub const WRITE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit", "NotebookEdit"];

/// Host lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookType {
    /// Before a tool runs. Gating.
    PreToolUse,
    /// After a tool ran. Gating.
    PostToolUse,
    /// Before the host compacts its context.
    PreCompact,
    /// A session starts (startup, resume, clear or after compaction).
    SessionStart,
    /// A session ends.
    SessionEnd,
    /// The user submitted a prompt.
    UserPromptSubmit,
}

impl HookType {
    /// Whether the hook decides if an action proceeds. Gating hooks fail closed.
    #[must_use]
    pub fn is_gating(self) -> bool {
        matches!(self, Self::PreToolUse | Self::PostToolUse)
    }

    /// All hook types.
    #[must_use]
    pub fn all() -> &'static [HookType] {
        &[
            Self::PreToolUse,
            Self::PostToolUse,
            Self::PreCompact,
            Self::SessionStart,
            Self::SessionEnd,
            Self::UserPromptSubmit,
        ]
    }
}

impl std::fmt::Display for HookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreToolUse => write!(f, "PreToolUse"),
            Self::PostToolUse => write!(f, "PostToolUse"),
            Self::PreCompact => write!(f, "PreCompact"),
            Self::SessionStart => write!(f, "SessionStart"),
            Self::SessionEnd => write!(f, "SessionEnd"),
            Self::UserPromptSubmit => write!(f, "UserPromptSubmit"),
        }
    }
}

impl FromStr for HookType {
    type Err = HookError;

    /// Accepts the host's event names and their kebab-case forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.to_string().to_ascii_lowercase() == folded)
            .ok_or_else(|| HookError::UnknownEvent(s.to_string()))
    }
}

/// JSON object the host writes to the hook's stdin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookInput {
    /// Host session id.
    pub session_id: String,
    /// Raw interaction log.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<PathBuf>,
    /// Agent working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Event name as the host reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_event_name: Option<String>,
    /// Tool being (or just) invoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool arguments.
    pub tool_input: Value,
    /// Tool output, for post-tool hooks.
    pub tool_response: Value,
    /// Submitted prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Session start source (`startup`, `resume`, `clear`, `compact`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Compaction trigger (`manual`, `auto`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    /// Host-reported token usage.
    pub usage: Value,
}

impl HookInput {
    /// Cumulative tokens the host reports, if any.
    ///
    /// Uses `total_tokens` when present, else the sum of the input, output
    /// and cache counters.
    #[must_use]
    pub fn reported_tokens(&self) -> Option<u64> {
        let usage = self.usage.as_object()?;
        if let Some(total) = usage.get("total_tokens").and_then(Value::as_u64) {
            return Some(total);
        }
        let parts = [
            "input_tokens",
            "output_tokens",
            "cache_creation_input_tokens",
            "cache_read_input_tokens",
        ];
        let mut seen = false;
        let mut sum = 0_u64;
        for key in parts {
            if let Some(n) = usage.get(key).and_then(Value::as_u64) {
                seen = true;
                sum = sum.saturating_add(n);
            }
        }
        seen.then_some(sum)
    }
}

/// What a handler sees: the event, the raw payload and the resolved session.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// Event being handled.
    pub hook_type: HookType,
    /// Host payload.
    pub input: HookInput,
    /// Session the event belongs to.
    pub session: SessionContext,
}

impl HookContext {
    /// Build a context, resolving a missing `cwd` to `fallback_cwd`.
    #[must_use]
    pub fn new(hook_type: HookType, input: HookInput, fallback_cwd: &Path) -> Self {
        let session_id = if input.session_id.trim().is_empty() {
            "unknown".to_string()
        } else {
            input.session_id.clone()
        };
        let cwd = input
            .cwd
            .clone()
            .unwrap_or_else(|| fallback_cwd.to_path_buf());
        let mut session = SessionContext::new(session_id, cwd);
        if let Some(path) = &input.transcript_path {
            session = session.with_transcript(path);
        }
        Self {
            hook_type,
            input,
            session,
        }
    }

    /// Tool name, empty when absent.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        self.input.tool_name.as_deref().unwrap_or_default()
    }

    /// Shell command of a `Bash` tool call.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        if self.tool_name() != "Bash" {
            return None;
        }
        self.input.tool_input.get("command").and_then(Value::as_str)
    }

    /// Whether the tool writes files.
    #[must_use]
    pub fn is_write_tool(&self) -> bool {
        WRITE_TOOLS.contains(&self.tool_name())
    }

    /// Target file of a write tool, resolved against the session directory.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        let input = &self.input.tool_input;
        let raw = input
            .get("file_path")
            .or_else(|| input.get("notebook_path"))
            .and_then(Value::as_str)?;
        Some(self.session.resolve(Path::new(raw)))
    }

    /// Text a write tool is about to put into the file.
    #[must_use]
    pub fn written_content(&self) -> Option<String> {
        let input = &self.input.tool_input;
        match self.tool_name() {
            "Write" => input.get("content").and_then(Value::as_str).map(str::to_string),
            "Edit" => input.get("new_string").and_then(Value::as_str).map(str::to_string),
            "NotebookEdit" => input.get("new_source").and_then(Value::as_str).map(str::to_string),
            "MultiEdit" => {
                let edits = input.get("edits")?.as_array()?;
                let parts: Vec<&str> = edits
                    .iter()
                    .filter_map(|e| e.get("new_string").and_then(Value::as_str))
                    .collect();
                (!parts.is_empty()).then(|| parts.join("\n"))
            }
            _ => None,
        }
    }
}

/// Handler decision, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookAction {
    /// Let the action proceed.
    Continue,
    /// Ask the human.
    Ask,
    /// Stop the action.
    Block,
}

/// Result returned by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookResult {
    /// Decision.
    pub action: HookAction,
    /// Why, for `Ask` and `Block`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Rule responsible for the decision.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Text added to the agent's context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_context: Option<String>,
}

impl HookResult {
    /// Proceed with nothing to add.
    #[must_use]
    pub fn continue_() -> Self {
        Self {
            action: HookAction::Continue,
            reason: None,
            rule_id: None,
            additional_context: None,
        }
    }

    /// Ask the user.
    #[must_use]
    pub fn ask(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Ask,
            reason: Some(reason.into()),
            ..Self::continue_()
        }
    }

    /// Block the action.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            action: HookAction::Block,
            reason: Some(reason.into()),
            ..Self::continue_()
        }
    }

    /// Proceed, adding `text` to the agent's context.
    #[must_use]
    pub fn context(text: impl Into<String>) -> Self {
        Self {
            additional_context: Some(text.into()),
            ..Self::continue_()
        }
    }

    /// Attach the responsible rule.
    #[must_use]
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    /// Attach context text.
    #[must_use]
    pub fn with_context(mut self, text: impl Into<String>) -> Self {
        self.additional_context = Some(text.into());
        self
    }

    /// Map a command verdict onto a hook decision.
    #[must_use]
    pub fn from_verdict(verdict: &Verdict) -> Self {
        let mut result = match verdict.kind {
            VerdictKind::Allow => Self {
                reason: Some(verdict.reason.clone()),
                ..Self::continue_()
            },
            VerdictKind::AskUser => Self::ask(verdict.reason.clone()),
            VerdictKind::Deny => Self::block(verdict.reason.clone()),
        };
        result.rule_id = verdict.rule_id().map(str::to_string);
        result
    }

    /// Whether the action is stopped.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.action == HookAction::Block
    }
}

/// Registered handler summary, for listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookInfo {
    /// Handler name.
    pub name: String,
    /// Event handled.
    pub hook_type: HookType,
    /// Priority (higher first).
    pub priority: i32,
    /// Timeout override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
