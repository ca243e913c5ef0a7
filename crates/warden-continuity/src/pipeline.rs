//! Capture → Refine → Summarize → persist, and brief injection.
//!
//! Stages hand off through files in the session's continuity directory, so a
//! crash loses at most the stage in flight. Every failure here is logged and
//! reported as [`WardenError::PipelineDegraded`]; nothing propagates to the
//! interactive session.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use warden_core::paths::StatePaths;
use warden_core::{BriefId, SessionContext, SessionId, WardenError};
use warden_settings::ContinuitySettings;

use crate::brief::{BriefSource, BriefStore, SessionBrief, project_root, render_injection};
use crate::capture::ContextCapture;
use crate::errors::{ContinuityError, Result, SummarizerError};
use crate::lock::RunLock;
use crate::refine::{ContextRefiner, RefineLimits, RefinedExcerpt};
use crate::status::{PipelineState, PipelineStatus, Trigger};
use crate::summarizer::{
    CommandSummarizer, Summarizer, build_prompt, cap_summary, parse_remaining_items,
    summarize_with_timeout,
};

const EXCERPT_FILE: &str = "excerpt.json";
/// Margin over the summarizer deadline before a run lock counts as stale.
const LOCK_SLACK_SECS: u64 = 120;

/// Result of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// Final state.
    pub state: PipelineState,
    /// Brief written, if any. A failed summarization still writes a fallback brief.
    pub brief_id: Option<BriefId>,
    /// Degradation detail when the run did not fully succeed.
    pub error: Option<WardenError>,
}

impl PipelineOutcome {
    fn degraded(stage: &str, error: &ContinuityError, brief_id: Option<BriefId>) -> Self {
        Self {
            state: PipelineState::Failed,
            brief_id,
            error: Some(WardenError::PipelineDegraded {
                stage: stage.to_string(),
                message: error.to_string(),
            }),
        }
    }
}

struct StageFailure {
    stage: &'static str,
    error: ContinuityError,
}

fn at(stage: &'static str) -> impl FnOnce(ContinuityError) -> StageFailure {
    move |error| StageFailure { stage, error }
}

/// Session continuity pipeline.
pub struct SessionContinuityPipeline {
    paths: StatePaths,
    settings: ContinuitySettings,
    summarizer: Option<Arc<dyn Summarizer>>,
}

impl std::fmt::Debug for SessionContinuityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContinuityPipeline")
            .field("root", &self.paths.root())
            .field("enabled", &self.settings.enabled)
            .field("has_summarizer", &self.summarizer.is_some())
            .finish()
    }
}

impl SessionContinuityPipeline {
    /// Pipeline using `summarizer` as the backend.
    #[must_use]
    pub fn new(
        paths: StatePaths,
        settings: ContinuitySettings,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            paths,
            settings,
            summarizer: Some(summarizer),
        }
    }

    /// Pipeline using the configured process backend. Without one, runs
    /// always fall back to excerpt briefs.
    #[must_use]
    pub fn from_settings(paths: StatePaths, settings: ContinuitySettings) -> Self {
        let summarizer = match CommandSummarizer::new(&settings.summarizer_command) {
            Ok(backend) => Some(Arc::new(backend) as Arc<dyn Summarizer>),
            Err(e) => {
                warn!(error = %e, "summarizer unavailable, briefs will use excerpts");
                None
            }
        };
        Self {
            paths,
            settings,
            summarizer,
        }
    }

    /// Effective continuity settings.
    #[must_use]
    pub fn settings(&self) -> &ContinuitySettings {
        &self.settings
    }

    /// Brief store of the project containing `cwd`.
    #[must_use]
    pub fn briefs(&self, cwd: &Path) -> BriefStore {
        self.project_briefs(&project_root(cwd))
    }

    fn project_briefs(&self, project: &Path) -> BriefStore {
        BriefStore::new(&self.paths.briefs_dir(), project, self.settings.max_briefs)
    }

    /// Last recorded run status.
    pub fn status(&self) -> Result<Option<PipelineStatus>> {
        PipelineStatus::read(&self.paths.pipeline_status_file())
    }

    /// Run the pipeline for `ctx`. Never fails; see [`PipelineOutcome`].
    pub async fn run(&self, ctx: &SessionContext, trigger: Trigger) -> PipelineOutcome {
        let session_id = &ctx.session_id;
        if !self.settings.enabled {
            debug!(session_id = %session_id, "continuity disabled");
            return PipelineOutcome {
                state: PipelineState::Idle,
                brief_id: None,
                error: None,
            };
        }

        let stale_after =
            Duration::from_secs(self.settings.summarizer_timeout_secs.saturating_add(LOCK_SLACK_SECS));
        let _lock = match RunLock::acquire(&self.paths.continuity_dir(session_id), stale_after) {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                info!(session_id = %session_id, %trigger, "continuity run already in progress, skipping");
                return PipelineOutcome {
                    state: PipelineState::Idle,
                    brief_id: None,
                    error: None,
                };
            }
            Err(error) => {
                warn!(session_id = %session_id, error = %error, "could not take run lock");
                return PipelineOutcome::degraded("lock", &error, None);
            }
        };

        info!(session_id = %session_id, %trigger, "continuity pipeline started");
        match self.run_stages(ctx, trigger).await {
            Ok(outcome) => outcome,
            Err(StageFailure { stage, error }) => {
                warn!(session_id = %session_id, stage, error = %error, "continuity pipeline failed");
                self.mark(
                    PipelineStatus::new(
                        PipelineState::Failed,
                        session_id.clone(),
                        format!("{stage} failed: {error}"),
                    ),
                    trigger,
                );
                PipelineOutcome::degraded(stage, &error, None)
            }
        }
    }

    async fn run_stages(
        &self,
        ctx: &SessionContext,
        trigger: Trigger,
    ) -> std::result::Result<PipelineOutcome, StageFailure> {
        let session_id = &ctx.session_id;
        let work_dir = self.paths.continuity_dir(session_id);
        let project = project_root(&ctx.cwd);

        self.progress(PipelineState::Capturing, session_id, trigger, "capturing interaction log");
        let transcript = ctx
            .transcript()
            .map(|p| ctx.resolve(p))
            .ok_or(ContinuityError::NoTranscript)
            .map_err(at("capture"))?;
        let snapshot = ContextCapture::new(&work_dir, self.settings.max_snapshots)
            .capture(&transcript)
            .map_err(at("capture"))?;

        self.progress(PipelineState::Refining, session_id, trigger, "refining snapshot");
        let excerpt_path = work_dir.join(EXCERPT_FILE);
        ContextRefiner::new(RefineLimits::from(&self.settings))
            .refine_file(session_id, &snapshot.path)
            .and_then(|excerpt| excerpt.save(&excerpt_path))
            .map_err(at("refine"))?;

        self.progress(PipelineState::Summarizing, session_id, trigger, "waiting for summary");
        let excerpt = RefinedExcerpt::load(&excerpt_path).map_err(at("summarize"))?;
        let summary = self.summarize(session_id, &excerpt).await;

        let max_chars = self.settings.max_summary_chars;
        let (brief, failure) = match summary {
            Ok(text) => {
                let text = cap_summary(&text, max_chars);
                let mut open_items = parse_remaining_items(&text);
                if open_items.is_empty() {
                    open_items.clone_from(&excerpt.open_items);
                }
                (
                    SessionBrief::new(
                        session_id.clone(),
                        project.clone(),
                        text,
                        open_items,
                        BriefSource::Summary,
                    ),
                    None,
                )
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "summarization failed, using excerpt brief");
                let text = cap_summary(&excerpt.render(), max_chars);
                (
                    SessionBrief::new(
                        session_id.clone(),
                        project.clone(),
                        text,
                        excerpt.open_items.clone(),
                        BriefSource::Excerpt,
                    ),
                    Some(ContinuityError::from(e)),
                )
            }
        };
        let brief = brief.with_statistics(excerpt.statistics.clone());
        let _ = self.project_briefs(&project).persist(&brief).map_err(at("persist"))?;
        remove_transient(&excerpt_path);

        let outcome = match failure {
            None => {
                let mut status =
                    PipelineStatus::new(PipelineState::Persisted, session_id.clone(), "brief persisted");
                status.brief_id = Some(brief.id.clone());
                self.mark(status, trigger);
                info!(session_id = %session_id, brief_id = %brief.id, "continuity pipeline finished");
                PipelineOutcome {
                    state: PipelineState::Persisted,
                    brief_id: Some(brief.id),
                    error: None,
                }
            }
            Some(error) => {
                let mut status = PipelineStatus::new(
                    PipelineState::Failed,
                    session_id.clone(),
                    format!("summarize failed, excerpt brief persisted: {error}"),
                );
                status.brief_id = Some(brief.id.clone());
                self.mark(status, trigger);
                PipelineOutcome::degraded("summarize", &error, Some(brief.id))
            }
        };
        Ok(outcome)
    }

    async fn summarize(
        &self,
        session_id: &SessionId,
        excerpt: &RefinedExcerpt,
    ) -> std::result::Result<String, SummarizerError> {
        let Some(summarizer) = &self.summarizer else {
            return Err(SummarizerError::NotConfigured);
        };
        let prompt = build_prompt(session_id, excerpt, self.settings.max_summary_chars);
        let timeout = Duration::from_secs(self.settings.summarizer_timeout_secs.max(1));
        summarize_with_timeout(summarizer.as_ref(), &prompt, timeout).await
    }

    /// Injection text for a starting session, at most once per session and
    /// brief, drawn only from the session's own project. Missing, stale or
    /// corrupt briefs yield `None`.
    pub fn inject(&self, ctx: &SessionContext) -> Option<String> {
        let session_id = &ctx.session_id;
        match self
            .briefs(&ctx.cwd)
            .take_for_injection(session_id, self.settings.brief_max_age_hours)
        {
            Ok(brief) => brief.map(|b| render_injection(&b)),
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "brief unavailable, starting without it");
                None
            }
        }
    }

    fn progress(&self, state: PipelineState, session_id: &SessionId, trigger: Trigger, message: &str) {
        debug!(session_id = %session_id, %state, "pipeline stage");
        self.mark(PipelineStatus::new(state, session_id.clone(), message), trigger);
    }

    fn mark(&self, mut status: PipelineStatus, trigger: Trigger) {
        status.trigger = Some(trigger);
        if let Err(e) = status.write(&self.paths.pipeline_status_file()) {
            warn!(error = %e, "failed to write pipeline status");
        }
    }
}

fn remove_transient(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove excerpt");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
