//! Handler trait.

use async_trait::async_trait;

use crate::errors::HookError;
use crate::types::{HookContext, HookResult, HookType};

/// A lifecycle hook handler.
///
/// Handlers run in descending priority. On gating hooks an error or timeout
/// is turned into `Ask` by the engine; on informational hooks it is logged
/// and ignored.
#[async_trait]
pub trait HookHandler: Send + Sync {
    /// Unique name.
    fn name(&self) -> &str;

    /// Event handled.
    fn hook_type(&self) -> HookType;

    /// Higher runs first. Default: 0.
    fn priority(&self) -> i32 {
        0
    }

    /// Timeout override in milliseconds.
    fn timeout_ms(&self) -> Option<u64> {
        None
    }

    /// Run the handler.
    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError>;

    /// Return `false` to skip this handler for `context`.
    fn should_handle(&self, _context: &HookContext) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
