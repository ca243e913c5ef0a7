//! Persisted session briefs and once-only injection.
//!
//! Briefs are kept per project so a session only ever resumes work from its
//! own repository.
//!
//! ```text
//! briefs/<project key>/
//! ├── 20250301T101500.123Z-<brief id>.json   immutable briefs
//! ├── latest.json                            pointer to the newest brief
//! └── injections.json                        session -> injected brief
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use warden_core::fs::{read_json_opt, write_json_atomic};
use warden_core::{BriefId, SessionId};

use crate::errors::{ContinuityError, Result};
use crate::transcript::SnapshotStatistics;

const LATEST_FILE: &str = "latest.json";
const INJECTIONS_FILE: &str = "injections.json";
/// Injection records kept before the oldest are forgotten.
const MAX_INJECTION_RECORDS: usize = 500;

/// Markers that identify a project root when walking up from a session cwd.
const PROJECT_MARKERS: &[&str] = &[".git", ".warden"];

/// Header placed in front of injected briefs.
pub const INJECTION_HEADER: &str = "## Context from previous session";

/// What the brief text was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefSource {
    /// Backend summary.
    Summary,
    /// Rendered excerpt, used when summarization failed.
    Excerpt,
}

impl std::fmt::Display for BriefSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::Summary => "summary",
            Self::Excerpt => "excerpt",
        })
    }
}

/// Handoff note for the next session. Never mutated after persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBrief {
    /// Brief identifier.
    pub id: BriefId,
    /// Session the brief was produced from.
    pub prior_session_id: SessionId,
    /// Project root the session worked in.
    #[serde(default)]
    pub project: PathBuf,
    /// Summary prose.
    pub summary_text: String,
    /// Outstanding work, in order.
    pub open_items: Vec<String>,
    /// Creation time.
    pub generated_at: DateTime<Utc>,
    /// Origin of `summary_text`.
    pub source: BriefSource,
    /// Snapshot statistics of the prior session.
    #[serde(default)]
    pub statistics: SnapshotStatistics,
}

impl SessionBrief {
    /// New brief stamped now.
    #[must_use]
    pub fn new(
        prior_session_id: SessionId,
        project: impl Into<PathBuf>,
        summary_text: impl Into<String>,
        open_items: Vec<String>,
        source: BriefSource,
    ) -> Self {
        Self {
            id: BriefId::new(),
            prior_session_id,
            project: project.into(),
            summary_text: summary_text.into(),
            open_items,
            generated_at: Utc::now(),
            source,
            statistics: SnapshotStatistics::default(),
        }
    }

    /// Attach snapshot statistics.
    #[must_use]
    pub fn with_statistics(mut self, statistics: SnapshotStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    fn file_name(&self) -> String {
        format!(
            "{}-{}.json",
            self.generated_at.format("%Y%m%dT%H%M%S%.3fZ"),
            self.id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LatestPointer {
    brief_id: BriefId,
    file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InjectionRecord {
    brief_id: BriefId,
    injected_at: DateTime<Utc>,
}

/// Nearest ancestor of `cwd` holding a project marker, else `cwd` itself.
#[must_use]
pub fn project_root(cwd: &Path) -> PathBuf {
    let cwd = std::fs::canonicalize(cwd).unwrap_or_else(|_| cwd.to_path_buf());
    cwd.ancestors()
        .find(|dir| PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .map_or_else(|| cwd.clone(), Path::to_path_buf)
}

/// Directory name for a project's briefs: basename plus a short path hash.
#[must_use]
pub fn project_key(project: &Path) -> String {
    let digest = Sha256::digest(project.to_string_lossy().as_bytes());
    let hash: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    let name: String = project
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() { hash } else { format!("{name}-{hash}") }
}

/// One project's persisted briefs.
#[derive(Debug, Clone)]
pub struct BriefStore {
    dir: PathBuf,
    project: PathBuf,
    max_briefs: usize,
}

impl BriefStore {
    /// Store for `project` under `briefs_root`, retaining at most `max_briefs` briefs.
    #[must_use]
    pub fn new(briefs_root: &Path, project: &Path, max_briefs: usize) -> Self {
        Self {
            dir: briefs_root.join(project_key(project)),
            project: project.to_path_buf(),
            max_briefs: max_briefs.max(1),
        }
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Project this store belongs to.
    pub fn project(&self) -> &Path {
        &self.project
    }

    /// Write `brief` and make it the latest. Last writer wins.
    pub fn persist(&self, brief: &SessionBrief) -> Result<PathBuf> {
        if brief.project != self.project {
            return Err(ContinuityError::ProjectMismatch {
                expected: self.project.clone(),
                found: brief.project.clone(),
            });
        }
        let file = brief.file_name();
        let path = self.dir.join(&file);
        write_json_atomic(&path, brief).map_err(|e| ContinuityError::io(&path, e))?;

        let latest = self.dir.join(LATEST_FILE);
        let pointer = LatestPointer {
            brief_id: brief.id.clone(),
            file,
        };
        write_json_atomic(&latest, &pointer).map_err(|e| ContinuityError::io(&latest, e))?;

        info!(
            brief_id = %brief.id,
            prior_session = %brief.prior_session_id,
            project = %self.project.display(),
            open_items = brief.open_items.len(),
            "brief persisted"
        );
        self.prune();
        Ok(path)
    }

    /// Most recent brief. A missing store is `Ok(None)`; a corrupt one is an error.
    pub fn latest(&self) -> Result<Option<SessionBrief>> {
        let latest = self.dir.join(LATEST_FILE);
        let Some(pointer) = read_json_opt::<LatestPointer>(&latest)
            .map_err(|e| ContinuityError::io(&latest, e))?
        else {
            return Ok(None);
        };
        let path = self.dir.join(&pointer.file);
        let brief = read_json_opt::<SessionBrief>(&path).map_err(|e| ContinuityError::io(&path, e))?;
        Ok(brief.filter(|b| b.id == pointer.brief_id && b.project == self.project))
    }

    /// Persisted briefs, oldest first. Unreadable files are skipped.
    pub fn history(&self) -> Vec<SessionBrief> {
        self.brief_files()
            .iter()
            .filter_map(|path| match read_json_opt::<SessionBrief>(path) {
                Ok(brief) => brief,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable brief");
                    None
                }
            })
            .collect()
    }

    /// The latest brief if `session_id` has not had it injected yet and it is
    /// younger than `max_age_hours` (0 disables the age check). Marks it injected.
    pub fn take_for_injection(
        &self,
        session_id: &SessionId,
        max_age_hours: u64,
    ) -> Result<Option<SessionBrief>> {
        let Some(brief) = self.latest()? else {
            return Ok(None);
        };

        if max_age_hours > 0 {
            let hours = i64::try_from(max_age_hours).unwrap_or(i64::MAX);
            let max_age = Duration::try_hours(hours).unwrap_or(Duration::MAX);
            if Utc::now().signed_duration_since(brief.generated_at) > max_age {
                debug!(brief_id = %brief.id, "latest brief too old to inject");
                return Ok(None);
            }
        }

        let ledger_path = self.dir.join(INJECTIONS_FILE);
        // Corrupt ledger counts as empty.
        let mut ledger: BTreeMap<String, InjectionRecord> = read_json_opt(&ledger_path)
            .unwrap_or_else(|e| {
                warn!(error = %e, "injection ledger unreadable, starting fresh");
                None
            })
            .unwrap_or_default();

        if ledger
            .get(session_id.as_str())
            .is_some_and(|r| r.brief_id == brief.id)
        {
            debug!(session_id = %session_id, brief_id = %brief.id, "brief already injected");
            return Ok(None);
        }

        let _ = ledger.insert(
            session_id.to_string(),
            InjectionRecord {
                brief_id: brief.id.clone(),
                injected_at: Utc::now(),
            },
        );
        if ledger.len() > MAX_INJECTION_RECORDS {
            let mut by_age: Vec<(String, DateTime<Utc>)> = ledger
                .iter()
                .map(|(k, r)| (k.clone(), r.injected_at))
                .collect();
            by_age.sort_by_key(|(_, at)| *at);
            let excess = ledger.len() - MAX_INJECTION_RECORDS;
            for (key, _) in by_age.into_iter().take(excess) {
                let _ = ledger.remove(&key);
            }
        }
        write_json_atomic(&ledger_path, &ledger).map_err(|e| ContinuityError::io(&ledger_path, e))?;

        info!(session_id = %session_id, brief_id = %brief.id, "brief selected for injection");
        Ok(Some(brief))
    }

    fn brief_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "json")
                    && p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n != LATEST_FILE && n != INJECTIONS_FILE)
            })
            .collect();
        files.sort();
        files
    }

    fn prune(&self) {
        let files = self.brief_files();
        if files.len() <= self.max_briefs {
            return;
        }
        let excess = files.len() - self.max_briefs;
        for path in files.into_iter().take(excess) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to prune brief");
            }
        }
    }
}

/// Text injected into a new session's initial context.
#[must_use]
pub fn render_injection(brief: &SessionBrief) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{INJECTION_HEADER}\n");
    let _ = writeln!(
        out,
        "Session {} ended {}.\n",
        brief.prior_session_id,
        brief.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    out.push_str(brief.summary_text.trim());
    out.push('\n');
    if !brief.open_items.is_empty() {
        out.push_str("\nOpen items:\n");
        for item in &brief.open_items {
            let _ = writeln!(out, "- {item}");
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    const PROJECT: &str = "/work/app";

    fn store(root: &Path, max_briefs: usize) -> BriefStore {
        BriefStore::new(root, Path::new(PROJECT), max_briefs)
    }

    fn brief(session: &str, text: &str) -> SessionBrief {
        SessionBrief::new(
            SessionId::from(session),
            PROJECT,
            text,
            vec!["wire cursor param".into()],
            BriefSource::Summary,
        )
    }

    #[test]
    fn empty_store_has_no_latest() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir.path().join("briefs"), 5);
        assert!(store.latest().unwrap().is_none());
        assert!(store.history().is_empty());
        assert!(store
            .take_for_injection(&SessionId::from("s"), 12)
            .unwrap()
            .is_none());
    }

    #[test]
    fn latest_is_last_writer() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 5);
        let first = brief("s1", "first");
        let second = brief("s2", "second");
        let _ = store.persist(&first).unwrap();
        let _ = store.persist(&second).unwrap();

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn injected_once_per_session() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 5);
        let b = brief("old", "summary");
        let _ = store.persist(&b).unwrap();

        let session = SessionId::from("new");
        let first = store.take_for_injection(&session, 12).unwrap();
        assert_eq!(first.unwrap().id, b.id);
        assert!(store.take_for_injection(&session, 12).unwrap().is_none());

        // A different session still gets it.
        assert!(store
            .take_for_injection(&SessionId::from("other"), 12)
            .unwrap()
            .is_some());
    }

    #[test]
    fn newer_brief_is_injected_into_same_session() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 5);
        let session = SessionId::from("s");
        let _ = store.persist(&brief("a", "one")).unwrap();
        assert!(store.take_for_injection(&session, 12).unwrap().is_some());

        let _ = store.persist(&brief("s", "two")).unwrap();
        let next = store.take_for_injection(&session, 12).unwrap().unwrap();
        assert_eq!(next.summary_text, "two");
    }

    #[test]
    fn stale_brief_not_injected() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 5);
        let mut old = brief("s1", "stale");
        old.generated_at = Utc::now() - Duration::hours(13);
        let _ = store.persist(&old).unwrap();

        assert!(store
            .take_for_injection(&SessionId::from("s2"), 12)
            .unwrap()
            .is_none());
        assert!(store
            .take_for_injection(&SessionId::from("s2"), 0)
            .unwrap()
            .is_some());
    }

    #[test]
    fn corrupt_latest_is_error() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 5);
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.dir().join(LATEST_FILE), "{broken").unwrap();
        assert_matches!(store.latest(), Err(ContinuityError::Io { .. }));
    }

    #[test]
    fn prunes_oldest() {
        let dir = TempDir::new().unwrap();
        let store = store(dir.path(), 2);
        let mut ids = Vec::new();
        for i in 0..4 {
            let mut b = brief("s", &format!("brief {i}"));
            b.generated_at = Utc::now() + Duration::seconds(i);
            ids.push(b.id.clone());
            let _ = store.persist(&b).unwrap();
        }
        let kept: Vec<BriefId> = store.history().into_iter().map(|b| b.id).collect();
        assert_eq!(kept, ids[2..].to_vec());
        assert_eq!(store.latest().unwrap().unwrap().id, ids[3]);
    }

    #[test]
    fn briefs_stay_in_their_project() {
        let dir = TempDir::new().unwrap();
        let app = store(dir.path(), 5);
        let _ = app.persist(&brief("a", "billing refactor half done")).unwrap();

        let other = BriefStore::new(dir.path(), Path::new("/work/other"), 5);
        assert_ne!(other.dir(), app.dir());
        assert!(other.latest().unwrap().is_none());
        assert!(other
            .take_for_injection(&SessionId::from("b"), 12)
            .unwrap()
            .is_none());
        assert_matches!(
            other.persist(&brief("a", "misplaced")),
            Err(ContinuityError::ProjectMismatch { .. })
        );
        assert!(app.take_for_injection(&SessionId::from("b"), 12).unwrap().is_some());
    }

    #[test]
    fn project_root_walks_up_to_marker() {
        let dir = TempDir::new().unwrap();
        let root = std::fs::canonicalize(dir.path()).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("src/api")).unwrap();
        assert_eq!(project_root(&root.join("src/api")), root);
    }

    #[test]
    fn project_key_is_readable_and_distinct() {
        let a = project_key(Path::new("/work/app"));
        let b = project_key(Path::new("/home/app"));
        assert!(a.starts_with("app-"));
        assert_eq!(a.len(), "app-".len() + 12);
        assert_ne!(a, b);
    }

    #[test]
    fn injection_text() {
        let mut b = brief("s-prev", "## What was done\n- cursor pagination");
        b.generated_at = DateTime::parse_from_rfc3339("2025-03-01T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        insta::assert_snapshot!(render_injection(&b), @r"
        ## Context from previous session

        Session s-prev ended 2025-03-01 10:15 UTC.

        ## What was done
        - cursor pagination

        Open items:
        - wire cursor param
        ");
    }
}
