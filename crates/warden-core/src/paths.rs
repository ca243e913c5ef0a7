//! State-directory layout.
//!
//! ```text
//! ~/.warden/
//! ├── settings.json
//! ├── usage.json              token ledger
//! ├── audit.jsonl             non-allow verdicts
//! ├── pipeline-status.json    last continuity run
//! ├── briefs/                 persisted session briefs + injection ledger
//! └── continuity/<session>/   transient snapshots and excerpts
//! ```

use std::path::{Path, PathBuf};

use crate::ids::SessionId;

/// Environment variable overriding the state root.
pub const HOME_ENV: &str = "WARDEN_HOME";

/// Resolve the state root (`$WARDEN_HOME`, else `~/.warden`).
pub fn warden_home() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".warden")
}

/// Paths of every persisted artifact under one state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    /// Layout rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout rooted at [`warden_home`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(warden_home())
    }

    /// State root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// User settings file.
    #[must_use]
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Token usage ledger.
    #[must_use]
    pub fn usage_file(&self) -> PathBuf {
        self.root.join("usage.json")
    }

    /// Policy audit log.
    #[must_use]
    pub fn audit_file(&self) -> PathBuf {
        self.root.join("audit.jsonl")
    }

    /// Continuity pipeline status file.
    #[must_use]
    pub fn pipeline_status_file(&self) -> PathBuf {
        self.root.join("pipeline-status.json")
    }

    /// Persisted briefs.
    #[must_use]
    pub fn briefs_dir(&self) -> PathBuf {
        self.root.join("briefs")
    }

    /// Transient working directory for one session's pipeline runs.
    #[must_use]
    pub fn continuity_dir(&self, session_id: &SessionId) -> PathBuf {
        self.root.join("continuity").join(session_id.file_stem())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_under_root() {
        let paths = StatePaths::new("/state");
        assert_eq!(paths.usage_file(), PathBuf::from("/state/usage.json"));
        assert_eq!(paths.briefs_dir(), PathBuf::from("/state/briefs"));
        assert_eq!(
            paths.continuity_dir(&SessionId::from("a/b")),
            PathBuf::from("/state/continuity/a_b")
        );
    }
}
