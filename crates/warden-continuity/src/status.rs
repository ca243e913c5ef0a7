//! Pipeline progress file.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warden_core::fs::{read_json_opt, write_json_atomic};
use warden_core::{BriefId, SessionId};

use crate::errors::{ContinuityError, Result};

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Not running.
    Idle,
    /// Copying the interaction log.
    Capturing,
    /// Reducing the snapshot.
    Refining,
    /// Waiting on the summarization backend.
    Summarizing,
    /// Brief written.
    Persisted,
    /// Run aborted or degraded.
    Failed,
}

impl PipelineState {
    /// Whether a run in this state has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Persisted | Self::Failed)
    }

    /// Nominal progress percentage.
    #[must_use]
    pub fn progress(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Capturing => 10,
            Self::Refining => 40,
            Self::Summarizing => 70,
            Self::Persisted | Self::Failed => 100,
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Refining => "refining",
            Self::Summarizing => "summarizing",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What started a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Host is about to compact the context.
    PreCompact,
    /// Host session ended.
    SessionEnd,
    /// Operator ran the pipeline by hand.
    Manual,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::PreCompact => "preCompact",
            Self::SessionEnd => "sessionEnd",
            Self::Manual => "manual",
        })
    }
}

/// Contents of `pipeline-status.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    /// Current stage.
    pub state: PipelineState,
    /// Session being processed.
    pub session_id: SessionId,
    /// Progress percentage.
    pub progress: u8,
    /// Human-readable detail.
    pub message: String,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Brief written by this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief_id: Option<BriefId>,
    /// What started the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,
}

impl PipelineStatus {
    /// Status entry for `state` stamped now.
    #[must_use]
    pub fn new(state: PipelineState, session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            state,
            session_id,
            progress: state.progress(),
            message: message.into(),
            updated_at: Utc::now(),
            brief_id: None,
            trigger: None,
        }
    }

    /// Read the status file, `None` when no run has been recorded.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        read_json_opt(path).map_err(|e| ContinuityError::io(path, e))
    }

    /// Overwrite the status file.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self).map_err(|e| ContinuityError::io(path, e))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
