//! `UserPromptSubmit` session-finish detection.

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::HookError;
use crate::handler::HookHandler;
use crate::types::{HookContext, HookResult, HookType};

const FINISH_REMINDER: &str = "\
The user appears to be wrapping up this session. Before finishing:
1. Confirm every requested change is complete and its tests pass.
2. Update the open items: what remains and any constraints the next session must respect.
3. Check changed files for unfinished markers (TODO, placeholder bodies, \"not implemented\").
A continuity brief will be generated from this session when it ends.";

/// Adds a wrap-up reminder when the prompt contains a finish keyword.
pub struct FinishDetector {
    pattern: Option<Regex>,
}

impl FinishDetector {
    /// Detector for `keywords`, matched case-insensitively on word boundaries.
    #[must_use]
    pub fn new(keywords: &[String]) -> Self {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(bounded)
            .collect();
        if alternatives.is_empty() {
            return Self { pattern: None };
        }
        let source = format!("(?i)(?:{})", alternatives.join("|"));
        match Regex::new(&source) {
            Ok(pattern) => Self {
                pattern: Some(pattern),
            },
            Err(e) => {
                warn!(error = %e, "finish keywords unusable, detection disabled");
                Self { pattern: None }
            }
        }
    }

    /// Keyword found in `prompt`, if any.
    #[must_use]
    pub fn detect<'a>(&self, prompt: &'a str) -> Option<&'a str> {
        self.pattern.as_ref()?.find(prompt).map(|m| m.as_str())
    }
}

fn bounded(keyword: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let mut out = String::new();
    if is_word(keyword.chars().next()) {
        out.push_str(r"\b");
    }
    out.push_str(&regex::escape(keyword));
    if is_word(keyword.chars().last()) {
        out.push_str(r"\b");
    }
    out
}

#[async_trait]
impl HookHandler for FinishDetector {
    fn name(&self) -> &str {
        "finish-detector"
    }

    fn hook_type(&self) -> HookType {
        HookType::UserPromptSubmit
    }

    fn should_handle(&self, context: &HookContext) -> bool {
        self.pattern.is_some() && context.input.prompt.is_some()
    }

    async fn handle(&self, context: &HookContext) -> Result<HookResult, HookError> {
        let prompt = context.input.prompt.as_deref().unwrap_or_default();
        Ok(match self.detect(prompt) {
            Some(keyword) => {
                debug!(session_id = %context.session.session_id, keyword, "finish keyword detected");
                HookResult::context(FINISH_REMINDER)
            }
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
    use std::path::Path;
    use warden_settings::HookSettings;

    fn detector() -> FinishDetector {
        FinishDetector::new(&HookSettings::default().finish_keywords)
    }

    #[test]
    fn matches_whole_words_only() {
        let d = detector();
        assert_eq!(d.detect("ok we're DONE here"), Some("DONE"));
        assert_eq!(d.detect("let's wrap up"), Some("wrap up"));
        assert_eq!(d.detect("that's all for today"), Some("that's all"));
        assert_eq!(d.detect("abandoned branch"), None);
        assert_eq!(d.detect("add a completed_at column"), None);
    }

    #[test]
    fn empty_keywords_disable_detection() {
        let d = FinishDetector::new(&[String::new()]);
        assert_eq!(d.detect("done"), None);
    }

    #[tokio::test]
    async fn adds_reminder_context() {
        let ctx = HookContext::new(
            HookType::UserPromptSubmit,
            HookInput {
                session_id: "s".into(),
                prompt: Some("finish the session please".into()),
                ..HookInput::default()
            },
            Path::new("/"),
        );
        let result = detector().handle(&ctx).await.unwrap();
        let text = result.additional_context.unwrap();
        assert!(text.contains("open items"));
        assert!(text.contains("unfinished markers"));
    }
}
