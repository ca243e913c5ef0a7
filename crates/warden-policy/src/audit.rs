//! Policy audit log.
//!
//! Every non-allow verdict is recorded with the command, rule id, and
//! timestamp. Entries are kept in a bounded in-memory ring and, when a
//! file is configured, appended to `audit.jsonl`. Audit failures are logged
//! and never change a verdict.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;
use warden_core::verdict::{Verdict, VerdictKind};
use warden_core::SessionContext;

/// Commands longer than this are truncated in audit entries.
const MAX_AUDIT_COMMAND_CHARS: usize = 2000;

/// One audited verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Session the command was attempted in.
    pub session_id: String,
    /// Working directory.
    pub cwd: String,
    /// Command text (possibly truncated).
    pub command: String,
    /// Decision.
    pub verdict: VerdictKind,
    /// Responsible rule, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    /// Reason.
    pub reason: String,
}

impl AuditEntry {
    /// Build an entry for a verdict.
    #[must_use]
    pub fn new(command: &str, verdict: &Verdict, ctx: &SessionContext) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            session_id: ctx.session_id.to_string(),
            cwd: ctx.cwd.display().to_string(),
            command: command.chars().take(MAX_AUDIT_COMMAND_CHARS).collect(),
            verdict: verdict.kind,
            rule_id: verdict.rule_id().map(ToString::to_string),
            reason: verdict.reason.clone(),
        }
    }
}

/// Bounded in-memory audit ring with optional JSONL persistence.
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    max_entries: usize,
    file: Option<PathBuf>,
}

impl AuditLog {
    /// In-memory audit log.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_entries: max_entries.max(1),
            file: None,
        }
    }

    /// Also append entries to a JSONL file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Record an entry.
    pub fn record(&self, entry: AuditEntry) {
        if let Some(path) = &self.file {
            if let Err(e) = append_line(path, &entry) {
                warn!(path = %path.display(), error = %e, "failed to append audit entry");
            }
        }
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            let _ = entries.pop_front();
        }
    }

    /// Most recent entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Number of entries held in memory.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether no entries are held in memory.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("entries", &self.len())
            .field("max_entries", &self.max_entries)
            .field("file", &self.file)
            .finish()
    }
}

fn append_line(path: &Path, entry: &AuditEntry) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
    line.push('\n');
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(line.as_bytes())
}

/// Read the last `limit` entries from an audit file. Malformed lines are
/// skipped.
pub fn read_audit_file(path: &Path, limit: usize) -> std::io::Result<Vec<AuditEntry>> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut entries = VecDeque::new();
    for line in std::io::BufReader::new(file).lines() {
        let line = line?;
        if let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) {
            entries.push_back(entry);
            if entries.len() > limit {
                let _ = entries.pop_front();
            }
        }
    }
    Ok(entries.into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
