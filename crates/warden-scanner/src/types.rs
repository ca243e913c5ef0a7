//! Findings produced by a scan.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use warden_core::WardenError;

/// What a finding is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FindingKind {
    /// Credential-shaped text.
    Secret,
    /// Placeholder or "not implemented" idiom.
    UnfinishedMarker,
    /// Operator-configured code pattern.
    ForbiddenPattern,
    /// Date outside the plausible window.
    SuspiciousTimestamp,
    /// File, or part of one, that could not be inspected for secrets.
    Unscanned,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret => write!(f, "secret"),
            Self::UnfinishedMarker => write!(f, "unfinished"),
            Self::ForbiddenPattern => write!(f, "forbidden-pattern"),
            Self::SuspiciousTimestamp => write!(f, "timestamp"),
            Self::Unscanned => write!(f, "unscanned"),
        }
    }
}

/// `path:line` of a finding. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct FindingLocation {
    /// File the finding is in.
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

impl fmt::Display for FindingLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// One scan result.
///
/// `excerpt` of a secret finding is always redacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFinding {
    /// Finding kind.
    pub kind: FindingKind,
    /// Where it was found.
    pub location: FindingLocation,
    /// Text shown to the user.
    pub excerpt: String,
    /// Detector id (secret pattern id, marker text, forbidden pattern id).
    pub detector: String,
    /// Whether the finding rejects the action.
    pub blocking: bool,
    /// Human-readable explanation.
    pub message: String,
}

impl ScanFinding {
    /// Blocking outcome for the user, if this finding blocks.
    #[must_use]
    pub fn to_error(&self) -> Option<WardenError> {
        if !self.blocking {
            return None;
        }
        Some(match self.kind {
            FindingKind::Secret => WardenError::ScanBlocking {
                location: self.location.to_string(),
                detector: self.detector.clone(),
            },
            _ => WardenError::PolicyViolation {
                rule_id: format!("scan.{}", self.detector),
                reason: format!("{} at {}", self.message, self.location),
            },
        })
    }
}

impl fmt::Display for ScanFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}: {}",
            self.location, self.kind, self.message, self.excerpt
        )
    }
}

/// Whether any finding blocks.
#[must_use]
pub fn has_blocking(findings: &[ScanFinding]) -> bool {
    findings.iter().any(|f| f.blocking)
}

/// Whether any file escaped inspection and needs a human look.
#[must_use]
pub fn needs_review(findings: &[ScanFinding]) -> bool {
    findings.iter().any(|f| f.kind == FindingKind::Unscanned)
}

/// Blocking findings only.
pub fn blocking(findings: &[ScanFinding]) -> impl Iterator<Item = &ScanFinding> {
    findings.iter().filter(|f| f.blocking)
}
