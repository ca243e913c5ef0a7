//! Handler registry, bucketed by event and sorted by priority.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::handler::HookHandler;
use crate::types::{HookInfo, HookType};

/// Registered handlers.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<HookType, Vec<Arc<dyn HookHandler>>>,
}

impl HookRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler, replacing one of the same name for the same event.
    pub fn register(&mut self, handler: Arc<dyn HookHandler>) {
        let hook_type = handler.hook_type();
        let handlers = self.hooks.entry(hook_type).or_default();
        handlers.retain(|h| h.name() != handler.name());
        debug!(name = handler.name(), %hook_type, priority = handler.priority(), "registering hook");
        handlers.push(handler);
        handlers.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Handlers for `hook_type`, highest priority first.
    #[must_use]
    pub fn get_handlers(&self, hook_type: HookType) -> Vec<Arc<dyn HookHandler>> {
        self.hooks.get(&hook_type).cloned().unwrap_or_default()
    }

    /// Summaries of every handler, grouped by event, highest priority first.
    #[must_use]
    pub fn list_all(&self) -> Vec<HookInfo> {
        let mut infos: Vec<HookInfo> = self
            .hooks
            .values()
            .flatten()
            .map(|h| HookInfo {
                name: h.name().to_string(),
                hook_type: h.hook_type(),
                priority: h.priority(),
                timeout_ms: h.timeout_ms(),
            })
            .collect();
        infos.sort_by(|a, b| {
            a.hook_type
                .to_string()
                .cmp(&b.hook_type.to_string())
                .then(b.priority.cmp(&a.priority))
                .then_with(|| a.name.cmp(&b.name))
        });
        infos
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hook_count", &self.count())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HookError;
    use crate::types::{HookContext, HookResult};
    use async_trait::async_trait;

    struct Named {
        name: &'static str,
        hook_type: HookType,
        priority: i32,
    }

    #[async_trait]
    impl HookHandler for Named {
        fn name(&self) -> &str {
            self.name
        }
        fn hook_type(&self) -> HookType {
            self.hook_type
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn handle(&self, _context: &HookContext) -> Result<HookResult, HookError> {
            Ok(HookResult::continue_())
        }
    }

    fn named(name: &'static str, hook_type: HookType, priority: i32) -> Arc<dyn HookHandler> {
        Arc::new(Named {
            name,
            hook_type,
            priority,
        })
    }

    #[test]
    fn sorted_by_priority_descending() {
        let mut registry = HookRegistry::new();
        registry.register(named("low", HookType::PreToolUse, 10));
        registry.register(named("high", HookType::PreToolUse, 100));
        registry.register(named("mid", HookType::PreToolUse, 50));
        let names: Vec<String> = registry
            .get_handlers(HookType::PreToolUse)
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(names, ["high", "mid", "low"]);
        assert!(registry.get_handlers(HookType::SessionEnd).is_empty());
    }

    #[test]
    fn same_name_replaces() {
        let mut registry = HookRegistry::new();
        registry.register(named("gate", HookType::PreToolUse, 10));
        registry.register(named("gate", HookType::PreToolUse, 50));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get_handlers(HookType::PreToolUse)[0].priority(), 50);
    }

    #[test]
    fn list_groups_by_event() {
        let mut registry = HookRegistry::new();
        registry.register(named("scan", HookType::PostToolUse, 0));
        registry.register(named("policy", HookType::PreToolUse, 10));
        registry.register(named("budget", HookType::PreToolUse, 100));
        let listed: Vec<(String, HookType)> = registry
            .list_all()
            .into_iter()
            .map(|i| (i.name, i.hook_type))
            .collect();
        assert_eq!(
            listed,
            [
                ("scan".to_string(), HookType::PostToolUse),
                ("budget".to_string(), HookType::PreToolUse),
                ("policy".to_string(), HookType::PreToolUse),
            ]
        );
        assert!(format!("{registry:?}").contains("hook_count"));
    }
}
