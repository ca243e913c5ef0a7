//! Per-session run lock.
//!
//! `run.lock` holds the pid of the process running the pipeline for a
//! session. A lock whose owner is gone, or that is older than the longest
//! possible run, is stale and may be taken over.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{ContinuityError, Result};

const LOCK_FILE: &str = "run.lock";

/// Held while a pipeline run is in flight. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Take the lock in `dir`. `Ok(None)` means another live run holds it.
    pub fn acquire(dir: &Path, stale_after: Duration) -> Result<Option<Self>> {
        std::fs::create_dir_all(dir).map_err(|e| ContinuityError::io(dir, e))?;
        let path = dir.join(LOCK_FILE);
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let pid = std::process::id();
                    file.write_all(pid.to_string().as_bytes())
                        .map_err(|e| ContinuityError::io(&path, e))?;
                    debug!(path = %path.display(), pid, "run lock taken");
                    return Ok(Some(Self { path }));
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if !is_stale(&path, stale_after) {
                        return Ok(None);
                    }
                    info!(path = %path.display(), "removing stale run lock");
                    match std::fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(ContinuityError::io(&path, e)),
                    }
                }
                Err(e) => return Err(ContinuityError::io(&path, e)),
            }
        }
        Ok(None)
    }

    /// Lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release run lock");
        }
    }
}

fn is_stale(path: &Path, stale_after: Duration) -> bool {
    let expired = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age >= stale_after);
    if expired {
        return true;
    }
    let owner = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| text.trim().parse::<u32>().ok());
    match owner {
        Some(pid) => !process_alive(pid),
        // Unreadable or half-written: only age can retire it.
        None => false,
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(3600);

    #[test]
    fn second_run_is_refused_until_release() {
        let dir = tempfile::tempdir().unwrap();
        let first = RunLock::acquire(dir.path(), LONG).unwrap().unwrap();
        assert!(first.path().exists());
        assert!(RunLock::acquire(dir.path(), LONG).unwrap().is_none());

        drop(first);
        assert!(!dir.path().join(LOCK_FILE).exists());
        assert!(RunLock::acquire(dir.path(), LONG).unwrap().is_some());
    }

    #[test]
    fn expired_lock_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCK_FILE), std::process::id().to_string()).unwrap();
        assert!(RunLock::acquire(dir.path(), LONG).unwrap().is_none());
        assert!(RunLock::acquire(dir.path(), Duration::ZERO).unwrap().is_some());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dead_owner_is_taken_over() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCK_FILE), u32::MAX.to_string()).unwrap();
        assert!(RunLock::acquire(dir.path(), LONG).unwrap().is_some());
    }
}
