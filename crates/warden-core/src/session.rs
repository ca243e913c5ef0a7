//! Explicit per-invocation session context.
//!
//! Every component call receives a [`SessionContext`] instead of consulting
//! process-global "current session" state. Hook processes build one from
//! the host payload and pass it down.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// The session an action is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// Host session identifier.
    pub session_id: SessionId,
    /// Working directory of the agent when the action was attempted.
    pub cwd: PathBuf,
    /// Location of the host's raw interaction log, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript_path: Option<PathBuf>,
}

impl SessionContext {
    /// Create a context for a session rooted at `cwd`.
    #[must_use]
    pub fn new(session_id: impl Into<SessionId>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.into(),
            cwd: cwd.into(),
            transcript_path: None,
        }
    }

    /// Attach the raw interaction log location.
    #[must_use]
    pub fn with_transcript(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcript_path = Some(path.into());
        self
    }

    /// Transcript path, if the host supplied one.
    pub fn transcript(&self) -> Option<&Path> {
        self.transcript_path.as_deref()
    }

    /// Resolve a possibly-relative path against the session's working directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_against_cwd() {
        let ctx = SessionContext::new("s1", "/work/project");
        assert_eq!(
            ctx.resolve(Path::new("src/main.rs")),
            PathBuf::from("/work/project/src/main.rs")
        );
    }

    #[test]
    fn resolve_keeps_absolute() {
        let ctx = SessionContext::new("s1", "/work/project");
        assert_eq!(ctx.resolve(Path::new("/etc/hosts")), PathBuf::from("/etc/hosts"));
    }

    #[test]
    fn serde_camel_case() {
        let ctx = SessionContext::new("s1", "/w").with_transcript("/t.jsonl");
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["transcriptPath"], "/t.jsonl");
    }
}
