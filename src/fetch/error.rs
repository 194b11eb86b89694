//! Error types for the fetch module.
//!
//! Every variant carries the URL it failed on so that the rendered message can
//! be stored verbatim as the failure reason of a [`FetchOutcome`](super::FetchOutcome).

use thiserror::Error;

/// Errors that can occur while fetching a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The attempt did not complete within the configured timeout.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// Non-2xx response.
    #[error("HTTP {status} {reason} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
        /// Canonical reason phrase, empty when unknown.
        reason: String,
    },

    /// The response started but its body could not be read as text.
    #[error("error reading response body from {url}: {source}")]
    Body {
        /// The URL whose body failed.
        url: String,
        /// The underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error, filling in the canonical reason phrase.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self::HttpStatus {
            url: url.into(),
            status,
            reason,
        }
    }

    /// Creates a body read error.
    pub fn body(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Body {
            url: url.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Maps a reqwest error raised while sending or reading, keeping timeouts distinct.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error, reading_body: bool) -> Self {
        if source.is_timeout() {
            Self::timeout(url)
        } else if source.is_builder() {
            Self::invalid_url(url)
        } else if reading_body {
            Self::body(url, source)
        } else {
            Self::network(url, source)
        }
    }
}

// No `From<reqwest::Error>`: every variant needs the URL, which the source error
// does not reliably carry.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_timeout_display() {
        let error = FetchError::timeout("https://example.com/100");
        assert_eq!(error.to_string(), "timeout fetching https://example.com/100");
    }

    #[test]
    fn test_fetch_error_http_status_display_includes_reason() {
        let error = FetchError::http_status("https://example.com/100", 500);
        assert_eq!(
            error.to_string(),
            "HTTP 500 Internal Server Error fetching https://example.com/100"
        );
    }

    #[test]
    fn test_fetch_error_http_status_unknown_code_has_empty_reason() {
        let error = FetchError::http_status("https://example.com/100", 599);
        let msg = error.to_string();
        assert!(msg.starts_with("HTTP 599"), "unexpected: {msg}");
        assert!(msg.contains("https://example.com/100"));
    }

    #[test]
    fn test_fetch_error_invalid_url_display() {
        let error = FetchError::invalid_url("not-a-url");
        let msg = error.to_string();
        assert!(msg.contains("invalid URL"), "Expected 'invalid URL' in: {msg}");
        assert!(msg.contains("not-a-url"), "Expected URL in: {msg}");
    }
}
