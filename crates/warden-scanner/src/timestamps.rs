//! Suspicious date detection in documentation-like files.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate};
use regex::Regex;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").unwrap());

static RELEASE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s*\[[0-9A-Za-z.+-]+\]\s*-\s*(\d{4}-\d{2}-\d{2})").unwrap()
});

/// A date outside the accepted window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateIssue {
    /// The date as written.
    pub text: String,
    /// Explanation.
    pub message: String,
}

/// Accepted window around `today`.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    today: NaiveDate,
    earliest: NaiveDate,
    latest: NaiveDate,
}

impl DateWindow {
    /// `[today - past_days, today + future_days]`.
    #[must_use]
    pub fn new(today: NaiveDate, past_days: i64, future_days: i64) -> Self {
        Self {
            today,
            earliest: today - Duration::days(past_days.max(0)),
            latest: today + Duration::days(future_days.max(0)),
        }
    }

    /// Issues on one line.
    ///
    /// Release headings (`## [1.2.0] - 2024-05-01`) must not be in the
    /// future at all; other dates must fall inside the window.
    #[must_use]
    pub fn check_line(&self, line: &str, changelog: bool) -> Vec<DateIssue> {
        if changelog {
            if let Some(text) = RELEASE_HEADING
                .captures(line)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
            {
                return match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                    Ok(date) if date > self.today => vec![DateIssue {
                        text: text.to_string(),
                        message: format!("release heading dated in the future ({text})"),
                    }],
                    _ => Vec::new(),
                };
            }
        }

        DATE.find_iter(line)
            .filter_map(|m| {
                let date = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok()?;
                if date < self.earliest {
                    Some(DateIssue {
                        text: m.as_str().to_string(),
                        message: format!("date {} is older than {}", m.as_str(), self.earliest),
                    })
                } else if date > self.latest {
                    Some(DateIssue {
                        text: m.as_str().to_string(),
                        message: format!("date {} is after {}", m.as_str(), self.latest),
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Files whose dates are checked: changelogs, readmes, docs and plain text.
#[must_use]
pub fn is_dated_document(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_uppercase())
        .unwrap_or_default();
    if name.starts_with("CHANGELOG") || name.starts_with("README") {
        return true;
    }
    if path.components().any(|c| c.as_os_str() == "docs") {
        return true;
    }
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md" | "rst" | "txt" | "adoc")
    )
}

/// Whether `path` is a changelog.
#[must_use]
pub fn is_changelog(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().to_uppercase().starts_with("CHANGELOG"))
}
