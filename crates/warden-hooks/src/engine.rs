//! Hook execution engine.
//!
//! Handlers for one event run sequentially in priority order, each under its
//! own timeout. The most severe decision wins (`Block > Ask > Continue`) and
//! a `Block` stops the chain. Context text from every handler that ran is
//! concatenated. A `Continue` that names a rule is kept as an explicit
//! allow.
//!
//! On gating hooks a handler error or timeout becomes `Ask`; on
//! informational hooks it is logged and treated as `Continue`.

use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use crate::handler::HookHandler;
use crate::registry::HookRegistry;
use crate::types::{HookAction, HookContext, HookResult};

/// Runs registered handlers for an event.
pub struct HookEngine {
    registry: HookRegistry,
    default_timeout_ms: u64,
}

impl HookEngine {
    /// Engine over `registry` with a per-handler default timeout.
    #[must_use]
    pub fn new(registry: HookRegistry, default_timeout_ms: u64) -> Self {
        Self {
            registry,
            default_timeout_ms: default_timeout_ms.max(1),
        }
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Run every handler for the context's event and aggregate the results.
    #[instrument(skip_all, fields(hook_type = %context.hook_type, session_id = %context.session.session_id))]
    pub async fn execute(&self, context: &HookContext) -> HookResult {
        let handlers = self.registry.get_handlers(context.hook_type);
        let start = Instant::now();

        let mut outcome = HookResult::continue_();
        let mut notes: Vec<String> = Vec::new();

        for handler in &handlers {
            if !handler.should_handle(context) {
                debug!(name = handler.name(), "hook skipped by filter");
                continue;
            }
            let result = self.run_single(handler.as_ref(), context).await;
            if let Some(text) = &result.additional_context {
                notes.push(text.clone());
            }
            let explicit_allow = result.action == HookAction::Continue
                && outcome.action == HookAction::Continue
                && outcome.rule_id.is_none()
                && result.rule_id.is_some();
            if explicit_allow {
                outcome.rule_id.clone_from(&result.rule_id);
                outcome.reason.clone_from(&result.reason);
            }
            if result.action > outcome.action {
                debug!(
                    name = handler.name(),
                    action = ?result.action,
                    reason = result.reason.as_deref().unwrap_or(""),
                    "hook escalated"
                );
                outcome = HookResult {
                    additional_context: None,
                    ..result
                };
            }
            if outcome.action == HookAction::Block {
                break;
            }
        }

        if !notes.is_empty() {
            outcome.additional_context = Some(notes.join("\n\n"));
        }
        debug!(
            handlers = handlers.len(),
            duration_ms = start.elapsed().as_millis(),
            action = ?outcome.action,
            "hook execution complete"
        );
        outcome
    }

    async fn run_single(&self, handler: &dyn HookHandler, context: &HookContext) -> HookResult {
        let timeout_ms = handler.timeout_ms().unwrap_or(self.default_timeout_ms);
        let gating = context.hook_type.is_gating();

        match tokio::time::timeout(Duration::from_millis(timeout_ms), handler.handle(context)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(name = handler.name(), error = %e, gating, "hook handler failed");
                if gating {
                    HookResult::ask(format!("{} could not evaluate this action: {e}", handler.name()))
                } else {
                    HookResult::continue_()
                }
            }
            Err(_) => {
                warn!(name = handler.name(), timeout_ms, gating, "hook handler timed out");
                if gating {
                    HookResult::ask(format!(
                        "{} did not finish within {timeout_ms}ms",
                        handler.name()
                    ))
                } else {
                    HookResult::continue_()
                }
            }
        }
    }
}

impl std::fmt::Debug for HookEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookEngine")
            .field("registry", &self.registry)
            .field("default_timeout_ms", &self.default_timeout_ms)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
