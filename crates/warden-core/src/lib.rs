//! # warden-core
//!
//! Foundation types shared by every warden crate.
//!
//! - Branded ID newtypes ([`SessionId`], [`BriefId`])
//! - [`SessionContext`], the explicit per-invocation session value
//! - [`Verdict`] returned by the command gate
//! - [`WardenError`] taxonomy for user-facing outcomes
//! - Logging initialization and state-directory layout

#![deny(unsafe_code)]

pub mod errors;
pub mod fs;
pub mod ids;
pub mod logging;
pub mod paths;
pub mod session;
pub mod verdict;

pub use errors::WardenError;
pub use ids::{BriefId, SessionId};
pub use session::SessionContext;
pub use verdict::{MatchedRule, Verdict, VerdictKind};
