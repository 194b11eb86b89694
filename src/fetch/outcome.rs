//! Per-URL outcomes and the ordered result set of a batch.

use std::collections::HashMap;
use std::fmt;

/// Result of the full attempt sequence for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body of the first acceptable response.
    Success(String),
    /// Error text of the final failed attempt.
    Failure(String),
}

impl FetchOutcome {
    /// Returns true for [`FetchOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Fetched content, if successful.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Success(content) => Some(content),
            Self::Failure(_) => None,
        }
    }

    /// Failure reason, if failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure(reason) => Some(reason),
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success(content) => write!(f, "ok ({} bytes)", content.len()),
            Self::Failure(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Mapping from URL to [`FetchOutcome`].
///
/// Keys are unique. Inserting an existing URL replaces its outcome in place,
/// so first-insertion order is kept for display and serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResults {
    entries: Vec<(String, FetchOutcome)>,
    index: HashMap<String, usize>,
}

impl FetchResults {
    /// Creates an empty result set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `url`, replacing any earlier one.
    pub fn insert(&mut self, url: impl Into<String>, outcome: FetchOutcome) {
        let url = url.into();
        if let Some(&position) = self.index.get(&url) {
            self.entries[position].1 = outcome;
        } else {
            self.index.insert(url.clone(), self.entries.len());
            self.entries.push((url, outcome));
        }
    }

    /// Outcome recorded for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&FetchOutcome> {
        self.index.get(url).map(|&position| &self.entries[position].1)
    }

    /// Number of distinct URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no URL has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful outcomes.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.iter().filter(|(_, outcome)| outcome.is_success()).count()
    }

    /// Number of failed outcomes.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// Iterates `(url, outcome)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FetchOutcome)> {
        self.entries
            .iter()
            .map(|(url, outcome)| (url.as_str(), outcome))
    }

    /// Iterates failed entries only.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter_map(|(url, outcome)| outcome.error().map(|reason| (url, reason)))
    }
}

impl FromIterator<(String, FetchOutcome)> for FetchResults {
    fn from_iter<I: IntoIterator<Item = (String, FetchOutcome)>>(iter: I) -> Self {
        let mut results = Self::new();
        for (url, outcome) in iter {
            results.insert(url, outcome);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = FetchOutcome::Success("<html/>".to_string());
        assert!(ok.is_success());
        assert_eq!(ok.content(), Some("<html/>"));
        assert_eq!(ok.error(), None);

        let failed = FetchOutcome::Failure("timeout fetching x".to_string());
        assert!(!failed.is_success());
        assert_eq!(failed.content(), None);
        assert_eq!(failed.error(), Some("timeout fetching x"));
    }

    #[test]
    fn test_results_duplicate_url_last_wins_keeps_position() {
        let mut results = FetchResults::new();
        results.insert("a", FetchOutcome::Failure("first".into()));
        results.insert("b", FetchOutcome::Success("b".into()));
        results.insert("a", FetchOutcome::Success("second".into()));

        assert_eq!(results.len(), 2);
        assert_eq!(results.get("a"), Some(&FetchOutcome::Success("second".into())));
        let urls: Vec<&str> = results.iter().map(|(url, _)| url).collect();
        assert_eq!(urls, vec!["a", "b"]);
    }

    #[test]
    fn test_results_counts_and_failures() {
        let results: FetchResults = vec![
            ("a".to_string(), FetchOutcome::Success(String::new())),
            ("b".to_string(), FetchOutcome::Failure("HTTP 500".into())),
            ("c".to_string(), FetchOutcome::Failure("timeout".into())),
        ]
        .into_iter()
        .collect();

        assert_eq!(results.succeeded(), 1);
        assert_eq!(results.failed(), 2);
        let failures: Vec<_> = results.failures().collect();
        assert_eq!(failures, vec![("b", "HTTP 500"), ("c", "timeout")]);
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            FetchOutcome::Success("abc".into()).to_string(),
            "ok (3 bytes)"
        );
        assert_eq!(
            FetchOutcome::Failure("boom".into()).to_string(),
            "failed: boom"
        );
    }
}
