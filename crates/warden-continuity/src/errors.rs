//! Continuity error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the summarization backend.
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// The backend did not answer within the deadline. Its result is discarded.
    #[error("summarizer timed out after {secs}s")]
    Timeout {
        /// Deadline in seconds.
        secs: u64,
    },

    /// The backend process could not be started or talked to.
    #[error("summarizer process error: {0}")]
    Process(#[from] std::io::Error),

    /// The backend exited unsuccessfully.
    #[error("summarizer exited with {status}: {stderr}")]
    Failed {
        /// Exit status description.
        status: String,
        /// Leading stderr text.
        stderr: String,
    },

    /// The backend reported an error or produced no text.
    #[error("summarizer returned no summary: {0}")]
    Empty(String),

    /// No backend command is configured.
    #[error("no summarizer command configured")]
    NotConfigured,
}

/// Errors from one pipeline stage.
#[derive(Debug, Error)]
pub enum ContinuityError {
    /// The session has no interaction log to capture.
    #[error("no transcript path for session")]
    NoTranscript,

    /// Filesystem failure, with the path involved.
    #[error("{path}: {source}")]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot holds no usable records.
    #[error("snapshot contains no records")]
    EmptySnapshot,

    /// A brief was written to another project's store.
    #[error("brief for {found} does not belong to project {expected}")]
    ProjectMismatch {
        /// Store's project.
        expected: PathBuf,
        /// Brief's project.
        found: PathBuf,
    },

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Summarization failed.
    #[error(transparent)]
    Summarizer(#[from] SummarizerError),
}

impl ContinuityError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for continuity operations.
pub type Result<T> = std::result::Result<T, ContinuityError>;
