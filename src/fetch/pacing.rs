//! Per-host request pacing.
//!
//! [`Pacer`] enforces a minimum spacing between request starts to the same
//! host. Requests to different hosts never wait on each other, and the first
//! request to any host proceeds immediately.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use creiq_core::fetch::Pacer;
//!
//! # async fn example() {
//! let pacer = Pacer::new(Duration::from_millis(500));
//!
//! // First request proceeds immediately
//! pacer.acquire("https://example.com/100").await;
//!
//! // Second request to the same host waits for the spacing
//! pacer.acquire("https://example.com/200").await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Per-host minimum spacing between request starts.
///
/// Shared by reference across concurrent fetches of one batch. `DashMap`
/// holds per-host state; the inner `tokio::sync::Mutex` makes the
/// check-then-update on the last start time atomic.
#[derive(Debug)]
pub struct Pacer {
    spacing: Duration,
    hosts: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl Pacer {
    /// Creates a pacer with the given spacing. A zero spacing disables pacing.
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            hosts: DashMap::new(),
        }
    }

    /// Creates a pacer that never waits.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether pacing is disabled.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.spacing.is_zero()
    }

    /// Configured spacing.
    #[must_use]
    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Waits until a request to `url`'s host may start, then records the start.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        if self.is_disabled() {
            return;
        }

        let host = extract_host(url);
        tracing::Span::current().record("host", host.as_str());

        // Clone the Arc so the DashMap shard lock is released before awaiting.
        let state = self
            .hosts
            .entry(host.clone())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone();

        let mut last_start = state.lock().await;
        if let Some(previous) = *last_start {
            let elapsed = previous.elapsed();
            if elapsed < self.spacing {
                let wait = self.spacing - elapsed;
                debug!(host = %host, wait_ms = wait.as_millis(), "pacing request");
                tokio::time::sleep(wait).await;
            }
        }
        *last_start = Some(Instant::now());
    }
}

/// Extracts the lowercase host from a URL, or `"unknown"` when it has none.
///
/// ```
/// use creiq_core::fetch::extract_host;
///
/// assert_eq!(extract_host("https://Example.COM/100"), "example.com");
/// assert_eq!(extract_host("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
