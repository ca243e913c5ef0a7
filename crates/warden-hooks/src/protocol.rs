//! Host stdin/stdout contract.
//!
//! The host writes one JSON object to stdin and reads a JSON object from
//! stdout plus the exit status: `0` proceed, `2` block (reason on stderr),
//! `3` ask the user.

use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::engine::HookEngine;
use crate::errors::HookError;
use crate::types::{HookAction, HookContext, HookInput, HookResult, HookType};

/// Proceed.
pub const EXIT_PROCEED: i32 = 0;
/// Block the action.
pub const EXIT_BLOCK: i32 = 2;
/// Ask the user.
pub const EXIT_ASK: i32 = 3;

/// What the hook process prints and returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookResponse {
    /// JSON document for stdout.
    pub stdout: Option<String>,
    /// Message for stderr.
    pub stderr: Option<String>,
    /// Process exit status.
    pub exit_code: i32,
}

impl HookResponse {
    fn silent() -> Self {
        Self {
            stdout: None,
            stderr: None,
            exit_code: EXIT_PROCEED,
        }
    }
}

/// Parse the stdin payload.
pub fn parse_input(raw: &str) -> Result<HookInput, HookError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HookError::InvalidInput("empty stdin".to_string()));
    }
    serde_json::from_str(trimmed).map_err(|e| HookError::InvalidInput(e.to_string()))
}

fn exit_code(action: HookAction) -> i32 {
    match action {
        HookAction::Continue => EXIT_PROCEED,
        HookAction::Ask => EXIT_ASK,
        HookAction::Block => EXIT_BLOCK,
    }
}

fn decision(action: HookAction) -> &'static str {
    match action {
        HookAction::Continue => "allow",
        HookAction::Ask => "ask",
        HookAction::Block => "deny",
    }
}

fn reason_text(result: &HookResult) -> Option<String> {
    let reason = result.reason.as_deref()?;
    Some(match &result.rule_id {
        Some(rule) => format!("{reason} [{rule}]"),
        None => reason.to_string(),
    })
}

/// Render an aggregated result for `hook_type`.
#[must_use]
pub fn render(hook_type: HookType, result: &HookResult) -> HookResponse {
    let reason = reason_text(result);
    let mut specific = Map::new();
    let _ = specific.insert("hookEventName".into(), json!(hook_type.to_string()));

    match hook_type {
        HookType::PreToolUse => {
            // A plain Continue defers to the host's own permission flow.
            if result.action != HookAction::Continue || result.rule_id.is_some() {
                let _ = specific.insert("permissionDecision".into(), json!(decision(result.action)));
                if let Some(reason) = &reason {
                    let _ = specific.insert("permissionDecisionReason".into(), json!(reason));
                }
            }
            if let Some(text) = &result.additional_context {
                let _ = specific.insert("additionalContext".into(), json!(text));
            }
            HookResponse {
                stdout: (specific.len() > 1)
                    .then(|| json!({ "hookSpecificOutput": specific }).to_string()),
                stderr: reason.filter(|_| result.action != HookAction::Continue),
                exit_code: exit_code(result.action),
            }
        }
        HookType::PostToolUse => {
            let mut doc = Map::new();
            if result.action == HookAction::Block {
                let _ = doc.insert("decision".into(), json!("block"));
            }
            if result.action != HookAction::Continue {
                if let Some(reason) = &reason {
                    let _ = doc.insert("reason".into(), json!(reason));
                }
            }
            if let Some(text) = &result.additional_context {
                let _ = specific.insert("additionalContext".into(), json!(text));
                let _ = doc.insert("hookSpecificOutput".into(), Value::Object(specific));
            }
            HookResponse {
                stdout: (!doc.is_empty()).then(|| Value::Object(doc).to_string()),
                stderr: reason.filter(|_| result.action != HookAction::Continue),
                exit_code: exit_code(result.action),
            }
        }
        HookType::SessionStart | HookType::UserPromptSubmit => match &result.additional_context {
            Some(text) => {
                let _ = specific.insert("additionalContext".into(), json!(text));
                HookResponse {
                    stdout: Some(json!({ "hookSpecificOutput": specific }).to_string()),
                    stderr: None,
                    exit_code: EXIT_PROCEED,
                }
            }
            None => HookResponse::silent(),
        },
        HookType::PreCompact | HookType::SessionEnd => HookResponse::silent(),
    }
}

/// Response when the payload could not be used. Gating hooks ask; others proceed.
#[must_use]
pub fn input_failure(hook_type: HookType, error: &HookError) -> HookResponse {
    warn!(%hook_type, error = %error, "unusable hook input");
    if hook_type.is_gating() {
        render(
            hook_type,
            &HookResult::ask(format!("warden could not read the hook input: {error}")),
        )
    } else {
        HookResponse::silent()
    }
}

/// Parse `raw`, run the engine and render the response.
pub async fn dispatch(
    engine: &HookEngine,
    hook_type: HookType,
    raw: &str,
    fallback_cwd: &Path,
) -> HookResponse {
    let input = match parse_input(raw) {
        Ok(input) => input,
        Err(e) => return input_failure(hook_type, &e),
    };
    let context = HookContext::new(hook_type, input, fallback_cwd);
    let result = engine.execute(&context).await;
    render(hook_type, &result)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HookRegistry;

    fn json_of(response: &HookResponse) -> Value {
        serde_json::from_str(response.stdout.as_deref().unwrap()).unwrap()
    }

    #[test]
    fn pre_tool_use_deny() {
        let result = HookResult::block("blocked by policy rule core.rm-root").with_rule("core.rm-root");
        let response = render(HookType::PreToolUse, &result);
        assert_eq!(response.exit_code, EXIT_BLOCK);
        assert!(response.stderr.unwrap().contains("core.rm-root"));
        insta::assert_json_snapshot!(json_of(&render(HookType::PreToolUse, &result)), @r#"
        {
          "hookSpecificOutput": {
            "hookEventName": "PreToolUse",
            "permissionDecision": "deny",
            "permissionDecisionReason": "blocked by policy rule core.rm-root [core.rm-root]"
          }
        }
        "#);
    }

    #[test]
    fn pre_tool_use_allow_and_ask() {
        let plain = render(HookType::PreToolUse, &HookResult::continue_());
        assert_eq!(plain.exit_code, EXIT_PROCEED);
        assert!(plain.stdout.is_none());

        let mut explicit = HookResult::continue_().with_rule("std.ls");
        explicit.reason = Some("allowed by rule std.ls".into());
        let allow = render(HookType::PreToolUse, &explicit);
        assert_eq!(allow.exit_code, EXIT_PROCEED);
        assert!(allow.stderr.is_none());
        assert_eq!(json_of(&allow)["hookSpecificOutput"]["permissionDecision"], "allow");

        let ask = render(HookType::PreToolUse, &HookResult::ask("no rule matches"));
        assert_eq!(ask.exit_code, EXIT_ASK);
        assert_eq!(json_of(&ask)["hookSpecificOutput"]["permissionDecision"], "ask");
    }

    #[test]
    fn post_tool_use_block_and_advice() {
        let block = render(HookType::PostToolUse, &HookResult::block("secret detected"));
        assert_eq!(block.exit_code, EXIT_BLOCK);
        assert_eq!(json_of(&block)["decision"], "block");

        let advice = render(HookType::PostToolUse, &HookResult::context("TODO left in src/a.rs:3"));
        assert_eq!(advice.exit_code, EXIT_PROCEED);
        assert_eq!(
            json_of(&advice)["hookSpecificOutput"]["additionalContext"],
            "TODO left in src/a.rs:3"
        );

        assert!(render(HookType::PostToolUse, &HookResult::continue_()).stdout.is_none());
    }

    #[test]
    fn session_start_injection() {
        let response = render(HookType::SessionStart, &HookResult::context("## Context"));
        assert_eq!(response.exit_code, EXIT_PROCEED);
        assert_eq!(
            json_of(&response)["hookSpecificOutput"]["additionalContext"],
            "## Context"
        );
        assert_eq!(render(HookType::SessionEnd, &HookResult::block("x")).exit_code, EXIT_PROCEED);
    }

    #[tokio::test]
    async fn unparseable_gating_input_asks() {
        let engine = HookEngine::new(HookRegistry::new(), 1000);
        let response = dispatch(&engine, HookType::PreToolUse, "{not json", Path::new("/")).await;
        assert_eq!(response.exit_code, EXIT_ASK);

        let response = dispatch(&engine, HookType::SessionStart, "", Path::new("/")).await;
        assert_eq!(response.exit_code, EXIT_PROCEED);
        assert!(response.stdout.is_none());
    }
}
