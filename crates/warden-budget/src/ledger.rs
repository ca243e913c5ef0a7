//! Persisted usage ledger (`usage.json`).
//!
//! Hook invocations are separate processes, so usage lives on disk. Every
//! update is a read-modify-write of the whole ledger under a process-local
//! lock, written atomically.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use warden_core::fs::{read_json_opt, write_json_atomic};
use warden_core::SessionId;

use crate::types::TokenUsage;

/// On-disk ledger document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageLedger {
    /// Usage per session id.
    pub sessions: BTreeMap<String, TokenUsage>,
    /// Session most recently started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_session: Option<SessionId>,
    /// Tokens charged across all sessions since the ledger was created.
    pub total_accumulated: u64,
}

/// File-backed ledger.
#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LedgerStore {
    /// Ledger at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Ledger file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger (empty when missing).
    pub fn load(&self) -> std::io::Result<UsageLedger> {
        let _guard = self.lock.lock();
        Ok(read_json_opt(&self.path)?.unwrap_or_default())
    }

    /// Apply `f` to the current ledger and persist the result.
    pub fn update<R>(&self, f: impl FnOnce(&mut UsageLedger) -> R) -> std::io::Result<R> {
        let _guard = self.lock.lock();
        let mut ledger: UsageLedger = read_json_opt(&self.path)?.unwrap_or_default();
        let result = f(&mut ledger);
        write_json_atomic(&self.path, &ledger)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerStore::new(dir.path().join("usage.json"));
        store
            .update(|l| {
                l.total_accumulated = 42;
                l.current_session = Some(SessionId::from("s1"));
            })
            .unwrap();
        let ledger = store.load().unwrap();
        assert_eq!(ledger.total_accumulated, 42);
        assert_eq!(ledger.current_session.unwrap().as_str(), "s1");
    }

    #[test]
    fn corrupt_ledger_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.json");
        std::fs::write(&path, "[").unwrap();
        assert!(LedgerStore::new(path).load().is_err());
    }
}
