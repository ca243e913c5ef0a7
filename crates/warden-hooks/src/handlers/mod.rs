//! Built-in handlers wiring the gates and the continuity pipeline to hooks.
//!
//! | Event              | Handler            | Priority |
//! |--------------------|--------------------|----------|
//! | `PreToolUse`       | `budget-gate`      | 1000     |
//! | `PreToolUse`       | `config-guard`     | 950      |
//! | `PreToolUse`       | `command-policy`   | 100      |
//! | `PreToolUse`       | `commit-guard`     | 90       |
//! | `PreToolUse`       | `write-scan`       | 80       |
//! | `PostToolUse`      | `artifact-scan`    | 100      |
//! | `PostToolUse`      | `token-usage`      | 50       |
//! | `PreCompact`       | `continuity`       | 0        |
//! | `SessionEnd`       | `continuity`       | 0        |
//! | `SessionStart`     | `budget-session`   | 100      |
//! | `SessionStart`     | `brief-injection`  | 50       |
//! | `UserPromptSubmit` | `finish-detector`  | 0        |

mod continuity;
mod gate;
mod prompt;
mod scan;
mod usage;

pub use continuity::{BriefInjection, BudgetSession, ContinuityLaunch, ContinuityTrigger};
pub use gate::{BudgetGate, CommandPolicyGate, CommitGate, ConfigGuard, WriteScanGate};
pub use prompt::FinishDetector;
pub use scan::ArtifactScanHandler;
pub use usage::TokenUsageHandler;

use std::sync::Arc;

use warden_budget::{LedgerStore, TokenBudgetMonitor};
use warden_commit::CommitGuard;
use warden_continuity::SessionContinuityPipeline;
use warden_core::paths::StatePaths;
use warden_policy::CommandPolicyEngine;
use warden_scanner::ArtifactScanner;
use warden_settings::WardenSettings;

use crate::engine::HookEngine;
use crate::errors::{HookError, Result};
use crate::registry::HookRegistry;

/// Components shared by the built-in handlers.
pub struct Services {
    /// Effective settings.
    pub settings: WardenSettings,
    /// State directory layout.
    pub paths: StatePaths,
    /// Command gate.
    pub policy: Arc<CommandPolicyEngine>,
    /// Token budget.
    pub budget: Arc<TokenBudgetMonitor>,
    /// Changed-file scanner.
    pub scanner: Arc<ArtifactScanner>,
    /// Commit validation.
    pub commit: Arc<CommitGuard>,
    /// Continuity pipeline.
    pub continuity: Arc<SessionContinuityPipeline>,
    /// How pipeline runs are started.
    pub launch: ContinuityLaunch,
}

impl Services {
    /// Build every component from settings.
    pub fn from_settings(
        settings: WardenSettings,
        paths: StatePaths,
        launch: ContinuityLaunch,
    ) -> Result<Self> {
        let policy = CommandPolicyEngine::from_settings(&settings.policy, Some(&paths.audit_file()))
            .map_err(|e| HookError::Setup(e.to_string()))?;
        let budget =
            TokenBudgetMonitor::with_ledger(settings.budget.clone(), LedgerStore::new(paths.usage_file()))
                .map_err(|e| HookError::Setup(e.to_string()))?;
        let scanner =
            ArtifactScanner::new(&settings.scanner).map_err(|e| HookError::Setup(e.to_string()))?;
        let commit =
            CommitGuard::new(&settings.commit).map_err(|e| HookError::Setup(e.to_string()))?;
        let continuity =
            SessionContinuityPipeline::from_settings(paths.clone(), settings.continuity.clone());
        Ok(Self {
            settings,
            paths,
            policy: Arc::new(policy),
            budget: Arc::new(budget),
            scanner: Arc::new(scanner),
            commit: Arc::new(commit),
            continuity: Arc::new(continuity),
            launch,
        })
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("root", &self.paths.root())
            .field("rules", &self.policy.store().len())
            .field("launch", &self.launch)
            .finish_non_exhaustive()
    }
}

/// Registry holding every built-in handler.
#[must_use]
pub fn default_registry(services: &Services) -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register(Arc::new(BudgetGate::new(Arc::clone(&services.budget))));
    registry.register(Arc::new(ConfigGuard::new(services.paths.root())));
    registry.register(Arc::new(CommandPolicyGate::new(Arc::clone(&services.policy))));
    registry.register(Arc::new(CommitGate::new(Arc::clone(&services.commit))));
    registry.register(Arc::new(WriteScanGate::new(Arc::clone(&services.scanner))));
    registry.register(Arc::new(ArtifactScanHandler::new(Arc::clone(&services.scanner))));
    registry.register(Arc::new(TokenUsageHandler::new(Arc::clone(&services.budget))));
    for hook_type in [crate::HookType::PreCompact, crate::HookType::SessionEnd] {
        registry.register(Arc::new(ContinuityTrigger::new(
            hook_type,
            Arc::clone(&services.continuity),
            services.launch.clone(),
            services.settings.continuity.enabled,
        )));
    }
    registry.register(Arc::new(BudgetSession::new(Arc::clone(&services.budget))));
    registry.register(Arc::new(BriefInjection::new(Arc::clone(&services.continuity))));
    registry.register(Arc::new(FinishDetector::new(&services.settings.hooks.finish_keywords)));
    registry
}

/// Engine over [`default_registry`] with the configured handler timeout.
#[must_use]
pub fn default_engine(services: &Services) -> HookEngine {
    HookEngine::new(
        default_registry(services),
        services.settings.hooks.handler_timeout_ms,
    )
}
