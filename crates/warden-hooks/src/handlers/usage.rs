//! `PostToolUse` token accounting.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use warden_budget::{BudgetError, BudgetLevel, TokenBudgetMonitor};
use warden_continuity::Transcript;
use warden_core::WardenError;

use super::gate::BUDGET_RULE_ID;
use crate::errors::HookError;
use crate::handler::HookHandler;
use crate::types::{HookContext, HookResult, HookType};

/// Charges the growth of the session's cumulative token count.
///
/// The count comes from the payload's `usage` object when the host sends
/// one, else from the usage recorded in the transcript.
pub struct TokenUsageHandler {
    monitor: Arc<TokenBudgetMonitor>,
}

impl TokenUsageHandler {
    /// Handler over `monitor`.
    #[must_use]
    pub fn new(monitor: Arc<TokenBudgetMonitor>) -> Self {
        Self { monitor }
    }

    async fn cumulative(context: &HookContext) -> Option<u64> {
        if let Some(total) = context.input.reported_tokens() {
            return Some(total);
        }
        let path = context.session.transcript()?;
        let path = context.session.resolve(path);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some(Transcript::parse(&text).statistics().total_tokens),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "transcript unreadable for usage");
                None
            }
        }
    }
}

#[async_trait]
impl HookHandler for TokenUsageHandler {
    fn name(&self) -> &str {
        "token-usage"
    }

    fn hook_type(&self) -> HookType {
        HookType::PostToolUse
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        if !self.monitor.settings().enabled {
            return Ok(HookResult::continue_());
        }
        let Some(cumulative) = Self::cumulative(context).await else {
            return Ok(HookResult::continue_());
        };
        match self.monitor.observe(&context.session.session_id, cumulative) {
            Ok(status) if status.level >= BudgetLevel::Warning => Ok(HookResult::context(format!(
                "Token budget {}: {}",
                status.level,
                status.summary()
            ))),
            Ok(_) => Ok(HookResult::continue_()),
            Err(BudgetError::Exceeded {
                session_id,
                consumed,
                limit,
            }) => {
                let outcome = WardenError::BudgetExceeded {
                    session_id,
                    consumed,
                    limit,
                    remaining: 0,
                };
                Ok(HookResult::block(outcome.to_string()).with_rule(BUDGET_RULE_ID))
            }
            Err(e) => Err(HookError::handler(self.name(), e)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HookAction, HookInput};
    use serde_json::json;
    use std::path::Path;
    use warden_core::SessionId;
    use warden_settings::BudgetSettings;

    fn monitor(limit: u64) -> Arc<TokenBudgetMonitor> {
        Arc::new(TokenBudgetMonitor::new(BudgetSettings {
            session_limit: limit,
            ..BudgetSettings::default()
        }))
    }

    fn with_usage(usage: serde_json::Value) -> HookContext {
        HookContext::new(
            HookType::PostToolUse,
            HookInput {
                session_id: "s1".into(),
                usage,
                ..HookInput::default()
            },
            Path::new("/"),
        )
    }

    #[tokio::test]
    async fn charges_reported_growth() {
        let monitor = monitor(1000);
        let handler = TokenUsageHandler::new(Arc::clone(&monitor));
        let _ = handler.handle(&with_usage(json!({"total_tokens": 300}))).await.unwrap();
        let _ = handler.handle(&with_usage(json!({"total_tokens": 500}))).await.unwrap();
        assert_eq!(monitor.status(&SessionId::from("s1")).unwrap().consumed, 500);
    }

    #[tokio::test]
    async fn warns_then_blocks() {
        let handler = TokenUsageHandler::new(monitor(1000));
        let warn = handler.handle(&with_usage(json!({"total_tokens": 800}))).await.unwrap();
        assert_eq!(warn.action, HookAction::Continue);
        assert!(warn.additional_context.unwrap().contains("800/1000"));

        let over = handler.handle(&with_usage(json!({"total_tokens": 1001}))).await.unwrap();
        assert!(over.is_blocked());
        assert_eq!(over.rule_id.as_deref(), Some(BUDGET_RULE_ID));
    }

    #[tokio::test]
    async fn reads_usage_from_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("t.jsonl");
        std::fs::write(
            &log,
            format!(
                "{}\n",
                json!({"type":"assistant","message":{"role":"assistant","content":"hi",
                    "usage":{"input_tokens":120,"output_tokens":30}}})
            ),
        )
        .unwrap();
        let monitor = monitor(1000);
        let handler = TokenUsageHandler::new(Arc::clone(&monitor));
        let ctx = HookContext::new(
            HookType::PostToolUse,
            HookInput {
                session_id: "s1".into(),
                transcript_path: Some(log),
                ..HookInput::default()
            },
            Path::new("/"),
        );
        let _ = handler.handle(&ctx).await.unwrap();
        assert_eq!(monitor.status(&SessionId::from("s1")).unwrap().consumed, 150);
    }

    #[tokio::test]
    async fn no_usage_is_noop() {
        let handler = TokenUsageHandler::new(monitor(1000));
        let result = handler.handle(&with_usage(serde_json::Value::Null)).await.unwrap();
        assert_eq!(result, HookResult::continue_());
    }
}
