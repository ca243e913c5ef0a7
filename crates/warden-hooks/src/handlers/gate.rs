//! `PreToolUse` gates.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use warden_budget::{BudgetError, TokenBudgetMonitor};
use warden_commit::{CommitAttempt, CommitError, CommitGuard};
use warden_core::WardenError;
use warden_policy::CommandPolicyEngine;
use warden_scanner::{ArtifactScanner, ScanFinding, needs_review};

use crate::errors::HookError;
use crate::handler::HookHandler;
use crate::types::{HookContext, HookResult, HookType};

/// Rule id reported when the budget overrides every other decision.
pub const BUDGET_RULE_ID: &str = "budget.exceeded";

/// Rule id shared with the shell rule guarding the same files.
pub const CONFIG_RULE_ID: &str = "core.warden-config";

/// Denies every tool call once the session budget is spent.
pub struct BudgetGate {
    monitor: Arc<TokenBudgetMonitor>,
}

impl BudgetGate {
    /// Gate over `monitor`.
    #[must_use]
    pub fn new(monitor: Arc<TokenBudgetMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl HookHandler for BudgetGate {
    fn name(&self) -> &str {
        "budget-gate"
    }

    fn hook_type(&self) -> HookType {
        HookType::PreToolUse
    }

    fn priority(&self) -> i32 {
        1000
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let session_id = &context.session.session_id;
        match self.monitor.check(session_id) {
            Ok(status) => {
                debug!(session_id = %session_id, level = %status.level, "budget ok");
                Ok(HookResult::continue_())
            }
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
                warn!(%outcome, "tool call denied by budget");
                Ok(HookResult::block(outcome.to_string()).with_rule(BUDGET_RULE_ID))
            }
            Err(e) => Err(HookError::handler(self.name(), e)),
        }
    }
}

/// Classifies `Bash` commands with the policy engine.
pub struct CommandPolicyGate {
    engine: Arc<CommandPolicyEngine>,
}

impl CommandPolicyGate {
    /// Gate over `engine`.
    #[must_use]
    pub fn new(engine: Arc<CommandPolicyEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl HookHandler for CommandPolicyGate {
    fn name(&self) -> &str {
        "command-policy"
    }

    fn hook_type(&self) -> HookType {
        HookType::PreToolUse
    }

    fn priority(&self) -> i32 {
        100
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        context.tool_name() == "Bash"
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let Some(command) = context.command() else {
            return Ok(HookResult::ask("Bash call without a command string"));
        };
        let verdict = self.engine.evaluate(command, &context.session);
        Ok(HookResult::from_verdict(&verdict))
    }
}

/// Validates `git commit` invocations.
pub struct CommitGate {
    guard: Arc<CommitGuard>,
}

impl CommitGate {
    /// Gate over `guard`.
    #[must_use]
    pub fn new(guard: Arc<CommitGuard>) -> Self {
        Self { guard }
    }
}

#[async_trait]
impl HookHandler for CommitGate {
    fn name(&self) -> &str {
        "commit-guard"
    }

    fn hook_type(&self) -> HookType {
        HookType::PreToolUse
    }

    fn priority(&self) -> i32 {
        90
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        context.command().is_some_and(|c| c.contains("git"))
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let Some(attempt) = context
            .command()
            .and_then(|c| CommitAttempt::from_command(c, &context.session.cwd))
        else {
            return Ok(HookResult::continue_());
        };

        match self.guard.validate(&attempt) {
            Ok(warnings) if warnings.is_empty() => Ok(HookResult::continue_()),
            Ok(warnings) => Ok(HookResult::context(format!(
                "Commit message notes:\n- {}",
                warnings.join("\n- ")
            ))),
            Err(e @ CommitError::Rejected { .. }) => {
                let outcome = e.to_outcome();
                info!(session_id = %context.session.session_id, %outcome, "commit blocked");
                Ok(HookResult::block(format!(
                    "{outcome}. Fix the message and commit again."
                ))
                .with_rule("commit.validation"))
            }
            Err(e) => Err(HookError::handler(self.name(), e)),
        }
    }
}

/// Scans the content a write tool is about to put on disk.
pub struct WriteScanGate {
    scanner: Arc<ArtifactScanner>,
}

impl WriteScanGate {
    /// Gate over `scanner`.
    #[must_use]
    pub fn new(scanner: Arc<ArtifactScanner>) -> Self {
        Self { scanner }
    }
}

#[async_trait]
impl HookHandler for WriteScanGate {
    fn name(&self) -> &str {
        "write-scan"
    }

    fn hook_type(&self) -> HookType {
        HookType::PreToolUse
    }

    fn priority(&self) -> i32 {
        80
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        context.is_write_tool()
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let (Some(path), Some(content)) = (context.file_path(), context.written_content()) else {
            return Ok(HookResult::continue_());
        };
        let findings = self.scanner.scan_content(&path, &content);
        Ok(findings_result(&findings))
    }
}

/// Refuses write tools aimed at warden's settings or state.
///
/// Covers any `.warden` directory and the state root, which may live
/// elsewhere when `WARDEN_HOME` is set.
pub struct ConfigGuard {
    state_root: PathBuf,
}

impl ConfigGuard {
    /// Guard protecting `state_root` in addition to `.warden` directories.
    #[must_use]
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: lexical(&state_root.into()),
        }
    }

    fn protects(&self, path: &Path) -> bool {
        let path = lexical(path);
        path.starts_with(&self.state_root)
            || path
                .components()
                .any(|c| c.as_os_str() == ".warden")
    }
}

#[async_trait]
impl HookHandler for ConfigGuard {
    fn name(&self) -> &str {
        "config-guard"
    }

    fn hook_type(&self) -> HookType {
        HookType::PreToolUse
    }

    fn priority(&self) -> i32 {
        950
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        context.is_write_tool()
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let Some(path) = context.file_path() else {
            return Ok(HookResult::continue_());
        };
        if !self.protects(&path) {
            return Ok(HookResult::continue_());
        }
        warn!(
            session_id = %context.session.session_id,
            path = %path.display(),
            "write to warden configuration refused"
        );
        Ok(HookResult::block(format!(
            "{} is part of warden's own configuration and cannot be changed from a session",
            path.display()
        ))
        .with_rule(CONFIG_RULE_ID))
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let _ = out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Block on the first blocking finding; otherwise surface advisories as context.
pub(crate) fn findings_result(findings: &[ScanFinding]) -> HookResult {
    if let Some((finding, outcome)) = findings
        .iter()
        .find_map(|f| f.to_error().map(|outcome| (f, outcome)))
    {
        let rule = format!("scan.{}", finding.detector);
        return HookResult::block(outcome.to_string()).with_rule(rule);
    }
    if findings.is_empty() {
        return HookResult::continue_();
    }
    let lines: Vec<String> = findings.iter().map(|f| format!("- {f}")).collect();
    if needs_review(findings) {
        return HookResult::ask(format!(
            "warden could not fully scan this change for secrets:\n{}",
            lines.join("\n")
        ))
        .with_rule("scan.unscanned");
    }
    HookResult::context(format!(
        "warden found issues to address before reporting this work as complete:\n{}",
        lines.join("\n")
    ))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
