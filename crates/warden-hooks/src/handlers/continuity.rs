//! Session lifecycle handlers: continuity runs, budget windows, brief injection.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use warden_budget::TokenBudgetMonitor;
use warden_continuity::{PipelineState, SessionContinuityPipeline, Trigger};
use warden_core::SessionContext;

use crate::errors::HookError;
use crate::handler::HookHandler;
use crate::types::{HookContext, HookResult, HookType};

const INLINE_RUN_SLACK_SECS: u64 = 30;

/// How a continuity run is started from a hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuityLaunch {
    /// Run inside the hook process and wait for it.
    Inline,
    /// Spawn `program pipeline run ...` and return immediately.
    Detached {
        /// Executable that understands the `pipeline run` subcommand.
        program: PathBuf,
    },
}

impl ContinuityLaunch {
    /// Arguments for a detached `pipeline run`.
    #[must_use]
    pub fn pipeline_args(session: &SessionContext, trigger: Trigger) -> Vec<String> {
        let trigger = match trigger {
            Trigger::PreCompact => "pre-compact",
            Trigger::SessionEnd => "session-end",
            Trigger::Manual => "manual",
        };
        let mut args = vec![
            "pipeline".to_string(),
            "run".to_string(),
            "--session-id".to_string(),
            session.session_id.to_string(),
            "--cwd".to_string(),
            session.cwd.display().to_string(),
            "--trigger".to_string(),
            trigger.to_string(),
        ];
        if let Some(transcript) = session.transcript() {
            args.push("--transcript".to_string());
            args.push(transcript.display().to_string());
        }
        args
    }
}

/// Starts the continuity pipeline on `PreCompact` and `SessionEnd`.
pub struct ContinuityTrigger {
    hook_type: HookType,
    pipeline: Arc<SessionContinuityPipeline>,
    launch: ContinuityLaunch,
    enabled: bool,
}

impl ContinuityTrigger {
    /// Trigger for `hook_type`.
    #[must_use]
    pub fn new(
        hook_type: HookType,
        pipeline: Arc<SessionContinuityPipeline>,
        launch: ContinuityLaunch,
        enabled: bool,
    ) -> Self {
        Self {
            hook_type,
            pipeline,
            launch,
            enabled,
        }
    }

    fn trigger(&self) -> Trigger {
        if self.hook_type == HookType::PreCompact {
            Trigger::PreCompact
        } else {
            Trigger::SessionEnd
        }
    }
}

#[async_trait]
impl HookHandler for ContinuityTrigger {
    fn name(&self) -> &str {
        "continuity"
    }

    fn hook_type(&self) -> HookType {
        self.hook_type
    }

    // Inline runs may wait on the summarizer for its full deadline.
    fn timeout_ms(&self) -> Option<u64> {
        match self.launch {
            ContinuityLaunch::Inline => {
                let secs = self.pipeline.settings().summarizer_timeout_secs;
                Some(secs.saturating_add(INLINE_RUN_SLACK_SECS).saturating_mul(1000))
            }
            ContinuityLaunch::Detached { .. } => None,
        }
    }

    fn should_handle(&self, _context: &HookContext) -> bool {
        self.enabled
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let trigger = self.trigger();
        match &self.launch {
            ContinuityLaunch::Inline => {
                let outcome = self.pipeline.run(&context.session, trigger).await;
                if outcome.state == PipelineState::Failed {
                    warn!(
                        session_id = %context.session.session_id,
                        error = ?outcome.error.as_ref().map(ToString::to_string),
                        "continuity run degraded"
                    );
                }
            }
            ContinuityLaunch::Detached { program } => {
                let args = ContinuityLaunch::pipeline_args(&context.session, trigger);
                let child = tokio::process::Command::new(program)
                    .args(&args)
                    .current_dir(&context.session.cwd)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                    .map_err(|e| HookError::handler(self.name(), e))?;
                info!(
                    session_id = %context.session.session_id,
                    trigger = %trigger,
                    pid = ?child.id(),
                    "continuity run detached"
                );
            }
        }
        Ok(HookResult::continue_())
    }
}

/// Opens a fresh budget window when a session starts from scratch.
pub struct BudgetSession {
    monitor: Arc<TokenBudgetMonitor>,
}

impl BudgetSession {
    /// Handler over `monitor`.
    #[must_use]
    pub fn new(monitor: Arc<TokenBudgetMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl HookHandler for BudgetSession {
    fn name(&self) -> &str {
        "budget-session"
    }

    fn hook_type(&self) -> HookType {
        HookType::SessionStart
    }

    fn priority(&self) -> i32 {
        100
    }

    // Resumed and compacted sessions keep counting against the same window.
    fn should_handle(&self, context: &HookContext) -> bool {
        matches!(context.input.source.as_deref(), None | Some("startup" | "clear"))
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let _ = self
            .monitor
            .begin_session(&context.session.session_id)
            .map_err(|e| HookError::handler(self.name(), e))?;
        Ok(HookResult::continue_())
    }
}

/// Injects the latest brief into a new session, once.
pub struct BriefInjection {
    pipeline: Arc<SessionContinuityPipeline>,
}

impl BriefInjection {
    /// Handler over `pipeline`.
    #[must_use]
    pub fn new(pipeline: Arc<SessionContinuityPipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl HookHandler for BriefInjection {
    fn name(&self) -> &str {
        "brief-injection"
    }

    fn hook_type(&self) -> HookType {
        HookType::SessionStart
    }

    fn priority(&self) -> i32 {
        50
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        Ok(match self.pipeline.inject(&context.session) {
            Some(text) => HookResult::context(text),
            None => HookResult::continue_(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HookInput;
    use serde_json::json;
    use std::path::Path;
    use warden_continuity::{INJECTION_HEADER, Summarizer, SummarizerError};
    use warden_core::SessionId;
    use warden_core::paths::StatePaths;
    use warden_settings::{BudgetSettings, ContinuitySettings};

    struct Canned;

    #[async_trait]
    impl Summarizer for Canned {
        async fn summarize(&self, _prompt: &str) -> Result<String, SummarizerError> {
            Ok("## What was done\n- paging\n\n## What remains\n- docs".into())
        }
    }

    fn pipeline(root: &Path) -> Arc<SessionContinuityPipeline> {
        Arc::new(SessionContinuityPipeline::new(
            StatePaths::new(root),
            ContinuitySettings::default(),
            Arc::new(Canned),
        ))
    }

    fn ctx(hook_type: HookType, session: &str, dir: &Path, extra: HookInput) -> HookContext {
        HookContext::new(
            hook_type,
            HookInput {
                session_id: session.into(),
                cwd: Some(dir.to_path_buf()),
                ..extra
            },
            Path::new("/"),
        )
    }

    #[tokio::test]
    async fn session_end_then_start_injects_brief() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("t.jsonl");
        std::fs::write(
            &log,
            format!("{}\n", json!({"type":"user","message":{"role":"user","content":"add paging"}})),
        )
        .unwrap();
        let pipeline = pipeline(&dir.path().join("state"));

        let trigger = ContinuityTrigger::new(
            HookType::SessionEnd,
            Arc::clone(&pipeline),
            ContinuityLaunch::Inline,
            true,
        );
        let end = ctx(
            HookType::SessionEnd,
            "old",
            dir.path(),
            HookInput {
                transcript_path: Some(log),
                ..HookInput::default()
            },
        );
        assert_eq!(trigger.handle(&end).await.unwrap(), HookResult::continue_());

        let injection = BriefInjection::new(pipeline);
        let start = ctx(HookType::SessionStart, "new", dir.path(), HookInput::default());
        let text = injection.handle(&start).await.unwrap().additional_context.unwrap();
        assert!(text.starts_with(INJECTION_HEADER));
        assert!(text.contains("- docs"));

        let again = injection.handle(&start).await.unwrap();
        assert!(again.additional_context.is_none());
    }

    #[tokio::test]
    async fn disabled_trigger_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let trigger = ContinuityTrigger::new(
            HookType::PreCompact,
            pipeline(dir.path()),
            ContinuityLaunch::Inline,
            false,
        );
        let c = ctx(HookType::PreCompact, "s", dir.path(), HookInput::default());
        assert!(!trigger.should_handle(&c));
    }

    #[test]
    fn detached_args_carry_session() {
        let session = SessionContext::new("s9", "/repo").with_transcript("/tmp/t.jsonl");
        let args = ContinuityLaunch::pipeline_args(&session, Trigger::PreCompact);
        assert_eq!(
            args,
            vec![
                "pipeline", "run", "--session-id", "s9", "--cwd", "/repo", "--trigger",
                "pre-compact", "--transcript", "/tmp/t.jsonl"
            ]
        );
    }

    #[tokio::test]
    async fn budget_window_opens_on_startup_only() {
        let monitor = Arc::new(TokenBudgetMonitor::new(BudgetSettings::default()));
        let id = SessionId::from("s1");
        let _ = monitor.charge(&id, 500).unwrap();
        let handler = BudgetSession::new(Arc::clone(&monitor));

        let resume = ctx(
            HookType::SessionStart,
            "s1",
            Path::new("/"),
            HookInput {
                source: Some("resume".into()),
                ..HookInput::default()
            },
        );
        assert!(!handler.should_handle(&resume));

        let startup = ctx(
            HookType::SessionStart,
            "s1",
            Path::new("/"),
            HookInput {
                source: Some("startup".into()),
                ..HookInput::default()
            },
        );
        assert!(handler.should_handle(&startup));
        let _ = handler.handle(&startup).await.unwrap();
        assert_eq!(monitor.status(&id).unwrap().consumed, 0);
    }
}
