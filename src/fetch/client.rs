//! HTTP session used for one batch of fetches.
//!
//! A [`Session`] wraps a pooled `reqwest::Client`. It is opened before the first
//! fetch of a batch and closed when dropped, whichever way the batch ends.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use super::FetchError;
use super::fetcher::FetcherError;

/// Pooled HTTP client scoped to a batch.
#[derive(Debug)]
pub struct Session {
    client: Client,
}

impl Session {
    /// Opens a session whose requests are bounded by `timeout` end to end,
    /// from connecting until the body has been read.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::Client`] if the HTTP client cannot be built
    /// (for example when the TLS backend fails to initialize).
    #[instrument(level = "debug", skip(user_agent), fields(timeout_ms = timeout.as_millis()))]
    pub fn open(timeout: Duration, user_agent: &str) -> Result<Self, FetcherError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()
            .map_err(FetcherError::Client)?;
        debug!("HTTP session opened");
        Ok(Self { client })
    }

    /// Performs one GET and buffers the body as text.
    ///
    /// Non-2xx responses are errors; their bodies are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] for invalid URLs, network failures, timeouts,
    /// non-2xx statuses and body read failures.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, false))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e, true))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!("HTTP session closed");
    }
}
