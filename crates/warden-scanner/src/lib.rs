//! # warden-scanner
//!
//! Post-action inspection of changed files. Two independent passes run on
//! every file: credential-shaped patterns (always blocking) and unfinished
//! work markers (advisory unless configured blocking). Operator-defined
//! forbidden patterns and date sanity checks ride along on the same pass.
//! Files that cannot be read in full are reported as `Unscanned` so a gate
//! can ask instead of passing them silently.

#![deny(unsafe_code)]

pub mod errors;
pub mod markers;
pub mod scanner;
pub mod secrets;
pub mod timestamps;
pub mod types;

pub use errors::{Result, ScannerError};
pub use scanner::ArtifactScanner;
pub use secrets::{redact, SecretDetector};
pub use types::{
    blocking, has_blocking, needs_review, FindingKind, FindingLocation, ScanFinding,
};
