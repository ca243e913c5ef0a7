//! Unfinished-work markers.

use regex::Regex;

use crate::errors::{Result, ScannerError};

/// Compiled marker list.
///
/// Word-shaped markers (`TODO`) match on word boundaries, phrases
/// (`not implemented`) match case-insensitively, anything else (`todo!(`)
/// matches literally.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    markers: Vec<(String, Regex)>,
}

impl MarkerSet {
    /// Compile `markers`; empty entries are ignored.
    pub fn new(markers: &[String]) -> Result<Self> {
        let mut compiled = Vec::with_capacity(markers.len());
        for marker in markers.iter().filter(|m| !m.trim().is_empty()) {
            let escaped = regex::escape(marker);
            let pattern = if marker.chars().all(|c| c.is_alphanumeric() || c == '_') {
                format!(r"\b{escaped}\b")
            } else if marker.contains(' ') {
                format!("(?i){escaped}")
            } else {
                escaped
            };
            let regex = Regex::new(&pattern).map_err(|source| ScannerError::InvalidPattern {
                id: marker.clone(),
                source,
            })?;
            compiled.push((marker.clone(), regex));
        }
        Ok(Self { markers: compiled })
    }

    /// First marker found in `line`.
    #[must_use]
    pub fn find(&self, line: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|(_, regex)| regex.is_match(line))
            .map(|(marker, _)| marker.as_str())
    }

    /// Whether no markers are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> MarkerSet {
        MarkerSet::new(&items.iter().map(|s| (*s).to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn word_markers_respect_boundaries() {
        let markers = set(&["TODO"]);
        assert_eq!(markers.find("// TODO: wire this up"), Some("TODO"));
        assert_eq!(markers.find("let todos = TODOLIST;"), None);
    }

    #[test]
    fn literal_markers() {
        let markers = set(&["todo!(", "unimplemented!("]);
        assert_eq!(markers.find("    todo!()"), Some("todo!("));
        assert_eq!(markers.find("unimplemented!(\"later\")"), Some("unimplemented!("));
    }

    #[test]
    fn phrases_ignore_case() {
        let markers = set(&["not implemented"]);
        assert_eq!(
            markers.find("raise RuntimeError('Not Implemented yet')"),
            Some("not implemented")
        );
    }

    #[test]
    fn blank_markers_ignored() {
        assert!(set(&["", "  "]).is_empty());
    }
}
