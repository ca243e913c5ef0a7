//! # warden-commit
//!
//! Commit message guard. [`CommitGuard::validate`] either accepts a
//! [`CommitAttempt`] (with advisory warnings) or rejects it with reasons;
//! it never edits the message. [`CommitAttempt::from_command`] extracts the
//! attempt from a `git commit` command line.

#![deny(unsafe_code)]

pub mod attempt;
pub mod errors;
pub mod guard;

pub use attempt::{AuthorFields, CommitAttempt};
pub use errors::{CommitError, Result};
pub use guard::CommitGuard;
