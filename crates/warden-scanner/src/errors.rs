//! Scanner construction errors.

use thiserror::Error;

/// Errors raised while building a scanner from settings.
///
/// Scanning itself never fails; unreadable files are skipped.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// A configured regex does not compile.
    #[error("invalid scanner pattern {id}: {source}")]
    InvalidPattern {
        /// Pattern id (or the marker text).
        id: String,
        /// Compile error.
        #[source]
        source: regex::Error,
    },

    /// A configured glob does not compile.
    #[error("invalid glob {glob}: {source}")]
    InvalidGlob {
        /// Offending glob.
        glob: String,
        /// Compile error.
        #[source]
        source: globset::Error,
    },
}

/// Result type for scanner construction.
pub type Result<T> = std::result::Result<T, ScannerError>;
