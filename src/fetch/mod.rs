//! Resilient retrieval of web content.
//!
//! This module fetches page bodies over HTTP/HTTPS. Each attempt is bounded by a
//! timeout, and failed attempts are retried a bounded number of times with a
//! fixed delay.
//!
//! # Features
//!
//! - Single-URL and batch fetching ([`Fetcher`])
//! - Bounded parallelism with results kept in input order
//! - Per-host request pacing ([`Pacer`])
//! - Batch-scoped HTTP session ([`Session`]), released on every exit path
//! - Per-URL failures recorded as data, never aborting the batch
//!
//! # Example
//!
//! ```no_run
//! use creiq_core::fetch::{FetchOutcome, FetchSettings, Fetcher};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = Fetcher::new(FetchSettings::default())?;
//! match fetcher.fetch("https://example.com/100").await? {
//!     FetchOutcome::Success(body) => println!("{} bytes", body.len()),
//!     FetchOutcome::Failure(reason) => eprintln!("failed: {reason}"),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod fetcher;
mod outcome;
mod pacing;
mod retry;

pub use client::Session;
pub use error::FetchError;
pub use fetcher::{
    DEFAULT_CONCURRENCY, DEFAULT_RATE_LIMIT, DEFAULT_TIMEOUT, FetchSettings, FetchStats, Fetcher,
    FetcherError, MAX_CONCURRENCY, MIN_CONCURRENCY,
};
pub use outcome::{FetchOutcome, FetchResults};
pub use pacing::{Pacer, extract_host};
pub use retry::{
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, FailureType, RetryDecision, RetryPolicy,
    classify_error,
};
