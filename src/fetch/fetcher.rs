//! Single and batch fetching with bounded retry.
//!
//! # Overview
//!
//! [`Fetcher::fetch`] retrieves one URL. [`Fetcher::fetch_multiple`] retrieves a
//! batch and returns one [`FetchOutcome`] per unique URL. Both open a
//! [`Session`] for the duration of the call only.
//!
//! # Example
//!
//! ```no_run
//! use creiq_core::fetch::{FetchSettings, Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(FetchSettings::default())?;
//! let results = fetcher
//!     .fetch_multiple(["https://example.com/100", "https://example.com/200"])
//!     .await?;
//! println!("{} ok, {} failed", results.succeeded(), results.failed());
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use tracing::{debug, info, instrument, warn};

use super::client::Session;
use super::outcome::{FetchOutcome, FetchResults};
use super::pacing::Pacer;
use super::retry::{RetryDecision, RetryPolicy, classify_error};
use super::FetchError;
use crate::user_agent;

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 32;

/// Default number of fetches in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default per-attempt timeout (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default spacing between request starts to the same host.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(500);

/// Error type for fetcher setup.
///
/// Per-URL failures are never reported here; they become
/// [`FetchOutcome::Failure`] entries instead.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// A zero timeout would fail every attempt.
    #[error("invalid timeout: must be greater than zero")]
    InvalidTimeout,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Settings shared by every fetch of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    /// Upper bound for a single attempt, body included.
    pub timeout: Duration,
    /// Retry count and fixed delay.
    pub retry: RetryPolicy,
    /// Fetches in flight at once.
    pub concurrency: usize,
    /// Minimum spacing between request starts to one host; zero disables.
    pub rate_limit: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: DEFAULT_RATE_LIMIT,
            user_agent: user_agent::default_user_agent(),
        }
    }
}

/// Counters for one batch run.
#[derive(Debug, Default)]
pub struct FetchStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    retried: AtomicUsize,
}

impl FetchStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of URLs fetched successfully.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Number of URLs that failed after all attempts.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Number of retry attempts made across the batch.
    #[must_use]
    pub fn retried(&self) -> usize {
        self.retried.load(Ordering::SeqCst)
    }

    fn increment_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_retried(&self) {
        self.retried.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fetches URLs with a timeout per attempt and a bounded, fixed-delay retry.
///
/// The fetcher itself holds only configuration. Each call opens its own
/// [`Session`], which is released when the call returns or its future is
/// dropped.
#[derive(Debug, Clone)]
pub struct Fetcher {
    settings: FetchSettings,
}

impl Fetcher {
    /// Creates a fetcher after validating `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::InvalidConcurrency`] if concurrency is outside
    /// 1..=32, or [`FetcherError::InvalidTimeout`] for a zero timeout.
    #[instrument(level = "debug", skip(settings))]
    pub fn new(settings: FetchSettings) -> Result<Self, FetcherError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&settings.concurrency) {
            return Err(FetcherError::InvalidConcurrency {
                value: settings.concurrency,
            });
        }
        if settings.timeout.is_zero() {
            return Err(FetcherError::InvalidTimeout);
        }

        debug!(
            concurrency = settings.concurrency,
            timeout_ms = settings.timeout.as_millis(),
            max_retries = settings.retry.max_retries(),
            retry_delay_ms = settings.retry.delay().as_millis(),
            rate_limit_ms = settings.rate_limit.as_millis(),
            "creating fetcher"
        );

        Ok(Self { settings })
    }

    /// Returns the validated settings.
    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Fetches a single URL in a one-shot session.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::Client`] only if the session cannot be opened.
    /// Fetch failures are returned as [`FetchOutcome::Failure`].
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetcherError> {
        let session = self.open_session()?;
        let pacer = Pacer::disabled();
        let stats = FetchStats::new();
        Ok(self.fetch_one(&session, &pacer, &stats, url).await)
    }

    /// Fetches every unique URL and returns one outcome per URL.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::Client`] only if the session cannot be opened.
    pub async fn fetch_multiple<I, S>(&self, urls: I) -> Result<FetchResults, FetcherError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch_multiple_with_progress(urls, |_, _| {}).await
    }

    /// Like [`fetch_multiple`](Self::fetch_multiple), calling `on_done` as each
    /// URL's outcome becomes final.
    ///
    /// Up to `concurrency` fetches run at once. Results keep input order.
    /// Dropping the returned future abandons in-flight requests and closes
    /// the session.
    ///
    /// # Errors
    ///
    /// Returns [`FetcherError::Client`] only if the session cannot be opened.
    #[instrument(skip_all, fields(concurrency = self.settings.concurrency))]
    pub async fn fetch_multiple_with_progress<I, S, F>(
        &self,
        urls: I,
        on_done: F,
    ) -> Result<FetchResults, FetcherError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &FetchOutcome),
    {
        let urls = unique_urls(urls);
        info!(urls = urls.len(), "starting batch");

        let session = self.open_session()?;
        let pacer = Pacer::new(self.settings.rate_limit);
        let stats = FetchStats::new();

        let (session_ref, pacer_ref, stats_ref, on_done_ref) = (&session, &pacer, &stats, &on_done);
        let results: FetchResults = stream::iter(urls)
            .map(move |url| async move {
                let outcome = self
                    .fetch_one(session_ref, pacer_ref, stats_ref, &url)
                    .await;
                on_done_ref(&url, &outcome);
                (url, outcome)
            })
            .buffered(self.settings.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        info!(
            succeeded = stats.succeeded(),
            failed = stats.failed(),
            retried = stats.retried(),
            total = results.len(),
            "batch complete"
        );

        Ok(results)
    }

    fn open_session(&self) -> Result<Session, FetcherError> {
        Session::open(self.settings.timeout, &self.settings.user_agent)
    }

    async fn fetch_one(
        &self,
        session: &Session,
        pacer: &Pacer,
        stats: &FetchStats,
        url: &str,
    ) -> FetchOutcome {
        match fetch_with_retry(session, url, &self.settings.retry, pacer, stats).await {
            Ok(body) => {
                debug!(url = %url, bytes = body.len(), "fetch succeeded");
                stats.increment_succeeded();
                FetchOutcome::Success(body)
            }
            Err((e, attempts)) => {
                warn!(url = %url, error = %e, attempts, "fetch failed after all attempts");
                stats.increment_failed();
                FetchOutcome::Failure(e.to_string())
            }
        }
    }
}

/// Fetches `url` with retry, returning the body or the final error and attempt count.
#[instrument(skip(session, policy, pacer, stats), fields(url = %url))]
async fn fetch_with_retry(
    session: &Session,
    url: &str,
    policy: &RetryPolicy,
    pacer: &Pacer,
    stats: &FetchStats,
) -> Result<String, (FetchError, u32)> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(attempt, max_attempts = policy.max_attempts(), "attempting fetch");

        pacer.acquire(url).await;

        match session.get_text(url).await {
            Ok(body) => return Ok(body),
            Err(e) => match policy.should_retry(classify_error(&e), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url = %url,
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying fetch"
                    );
                    stats.increment_retried();
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, %reason, "not retrying fetch");
                    return Err((e, attempt));
                }
            },
        }
    }
}

/// Drops repeated URLs, keeping the first occurrence's position.
fn unique_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(Into::<String>::into)
        .filter(|url| seen.insert(url.clone()))
        .collect()
}
