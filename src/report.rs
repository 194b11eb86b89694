//! JSON results files.
//!
//! Parsed pages are written with [`write_parsed`]. The fetch results document is an object keyed by URL, in fetch order:
//!
//! ```json
//! {
//!   "https://example.com/100": { "success": true, "content": "<html>..." },
//!   "https://example.com/200": { "success": false, "error": "HTTP 500 ..." }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::fetch::{FetchOutcome, FetchResults};
use crate::parse::ParsedResults;

/// Errors reading or writing a results file.
#[derive(Debug, Error)]
pub enum ReportError {
    /// File system error.
    #[error("IO error on results file {path}: {source}")]
    Io {
        /// The results file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The document could not be encoded or decoded.
    #[error("invalid results JSON in {path}: {source}")]
    Json {
        /// The results file path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ReportError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a JSON error.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Writes `results` to `path` as pretty JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the directory or file cannot be written.
#[instrument(skip(results), fields(path = %path.display(), entries = results.len()))]
pub fn write_results(path: &Path, results: &FetchResults) -> Result<(), ReportError> {
    write_json(path, results)?;
    info!("results written");
    Ok(())
}

/// Writes parsed pages to `path` as pretty JSON keyed by page URL.
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the directory or file cannot be written.
#[instrument(skip(parsed), fields(path = %path.display(), pages = parsed.len()))]
pub fn write_parsed(path: &Path, parsed: &ParsedResults) -> Result<(), ReportError> {
    write_json(path, parsed)?;
    info!("parsed results written");
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| ReportError::json(path, e))?;
    fs::write(path, json).map_err(|e| ReportError::io(path, e))
}

/// Reads a results file written by [`write_results`].
///
/// # Errors
///
/// Returns [`ReportError::Io`] if the file cannot be read and
/// [`ReportError::Json`] if it is not a results document.
#[instrument(fields(path = %path.display()))]
pub fn read_results(path: &Path) -> Result<FetchResults, ReportError> {
    let raw = fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;
    let results: FetchResults =
        serde_json::from_str(&raw).map_err(|e| ReportError::json(path, e))?;
    debug!(entries = results.len(), "results read");
    Ok(results)
}

/// One document entry.
#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<&FetchOutcome> for Entry {
    fn from(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Success(content) => Self {
                success: true,
                content: Some(content.clone()),
                error: None,
            },
            FetchOutcome::Failure(reason) => Self {
                success: false,
                content: None,
                error: Some(reason.clone()),
            },
        }
    }
}

impl Entry {
    fn into_outcome<E: de::Error>(self, url: &str) -> Result<FetchOutcome, E> {
        match (self.success, self.content, self.error) {
            (true, Some(content), _) => Ok(FetchOutcome::Success(content)),
            (false, _, Some(reason)) => Ok(FetchOutcome::Failure(reason)),
            (true, None, _) => Err(E::custom(format!(
                "entry for {url} is marked successful but has no content"
            ))),
            (false, _, None) => Err(E::custom(format!(
                "entry for {url} is marked failed but has no error"
            ))),
        }
    }
}

impl Serialize for FetchResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (url, outcome) in self.iter() {
            map.serialize_entry(url, &Entry::from(outcome))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FetchResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ResultsVisitor)
    }
}

/// Visits entries in document order so insertion order survives a round trip.
struct ResultsVisitor;

impl<'de> Visitor<'de> for ResultsVisitor {
    type Value = FetchResults;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping URLs to fetch outcomes")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut results = FetchResults::new();
        while let Some((url, entry)) = access.next_entry::<String, Entry>()? {
            let outcome = entry.into_outcome(&url)?;
            results.insert(url, outcome);
        }
        Ok(results)
    }
}
