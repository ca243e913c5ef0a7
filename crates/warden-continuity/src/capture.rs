//! Durable copy of the raw interaction log.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};
use warden_core::fs::write_atomic;

use crate::errors::{ContinuityError, Result};

const SNAPSHOT_PREFIX: &str = "snapshot-";
const SNAPSHOT_SUFFIX: &str = ".jsonl";

/// A captured snapshot on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedSnapshot {
    /// Snapshot file.
    pub path: PathBuf,
    /// Size in bytes.
    pub bytes: u64,
}

/// Copies a session's interaction log into its continuity directory.
#[derive(Debug, Clone)]
pub struct ContextCapture {
    dir: PathBuf,
    max_snapshots: usize,
}

impl ContextCapture {
    /// Capture into `dir`, keeping at most `max_snapshots` snapshots.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_snapshots: usize) -> Self {
        Self {
            dir: dir.into(),
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Copy `transcript` to `snapshot-<timestamp>.jsonl` and prune old ones.
    pub fn capture(&self, transcript: &Path) -> Result<CapturedSnapshot> {
        let bytes = std::fs::read(transcript).map_err(|e| ContinuityError::io(transcript, e))?;
        let name = format!(
            "{SNAPSHOT_PREFIX}{}{SNAPSHOT_SUFFIX}",
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        );
        let path = self.dir.join(name);
        write_atomic(&path, &bytes).map_err(|e| ContinuityError::io(&path, e))?;
        info!(path = %path.display(), bytes = bytes.len(), "context captured");
        self.prune();
        Ok(CapturedSnapshot {
            path,
            bytes: bytes.len() as u64,
        })
    }

    /// Snapshots in this directory, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut snapshots: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(SNAPSHOT_SUFFIX))
            })
            .collect();
        snapshots.sort();
        snapshots
    }

    fn prune(&self) {
        let snapshots = self.snapshots();
        let excess = snapshots.len().saturating_sub(self.max_snapshots);
        for old in snapshots.into_iter().take(excess) {
            match std::fs::remove_file(&old) {
                Ok(()) => debug!(path = %old.display(), "pruned snapshot"),
                Err(e) => debug!(path = %old.display(), error = %e, "failed to prune snapshot"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("t.jsonl");
        std::fs::write(&log, "{\"type\":\"user\"}\n").unwrap();
        let capture = ContextCapture::new(dir.path().join("cont"), 3);
        let snap = capture.capture(&log).unwrap();
        assert_eq!(snap.bytes, 16);
        assert_eq!(std::fs::read(&snap.path).unwrap(), std::fs::read(&log).unwrap());
    }

    #[test]
    fn missing_log_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let capture = ContextCapture::new(dir.path(), 3);
        let err = capture.capture(&dir.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(err, ContinuityError::Io { .. }));
        assert!(capture.snapshots().is_empty());
    }

    #[test]
    fn prunes_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let cont = dir.path().join("cont");
        std::fs::create_dir_all(&cont).unwrap();
        for name in ["snapshot-20200101T000000.000Z.jsonl", "snapshot-20200102T000000.000Z.jsonl"] {
            std::fs::write(cont.join(name), "{}").unwrap();
        }
        let log = dir.path().join("t.jsonl");
        std::fs::write(&log, "{}").unwrap();
        let capture = ContextCapture::new(&cont, 2);
        let snap = capture.capture(&log).unwrap();
        let remaining = capture.snapshots();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.contains(&snap.path));
        assert!(!cont.join("snapshot-20200101T000000.000Z.jsonl").exists());
    }
}
