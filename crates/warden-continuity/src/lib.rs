//! # warden-continuity
//!
//! Carries working context across compaction and session restarts.
//!
//! A run captures the host's interaction log, refines it to the salient
//! state, asks an external backend for a short brief and persists it. The
//! next session start injects the latest brief once.

#![deny(unsafe_code)]

pub mod brief;
pub mod capture;
pub mod errors;
pub mod lock;
pub mod pipeline;
pub mod refine;
pub mod status;
pub mod summarizer;
pub mod transcript;

pub use brief::{
    BriefSource, BriefStore, INJECTION_HEADER, SessionBrief, project_key, project_root,
    render_injection,
};
pub use capture::{CapturedSnapshot, ContextCapture};
pub use errors::{ContinuityError, Result, SummarizerError};
pub use lock::RunLock;
pub use pipeline::{PipelineOutcome, SessionContinuityPipeline};
pub use refine::{ContextRefiner, ExcerptEntry, RefineLimits, RefinedExcerpt};
pub use status::{PipelineState, PipelineStatus, Trigger};
pub use summarizer::{
    CommandSummarizer, Summarizer, build_prompt, parse_remaining_items, parse_summarizer_output,
    summarize_with_timeout,
};
pub use transcript::{ContentBlock, RecordKind, SnapshotStatistics, Transcript, TranscriptRecord};
