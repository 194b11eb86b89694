//! CREIQ Core Library
//!
//! Reads property roll numbers from a CSV file, turns them into request URLs
//! with a configured template, and fetches the pages behind those URLs with
//! bounded retry. Fetched appeal pages can be parsed into property and appeal
//! records. Results can be saved as JSON documents keyed by URL.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Validated run configuration from env file, environment and CLI
//! - [`input`] - Identifier loading from a delimited file
//! - [`url_builder`] - URL construction from a base template
//! - [`fetch`] - HTTP fetching with timeout, retry and per-host pacing
//! - [`parse`] - Property and appeal data from fetched pages
//! - [`report`] - JSON results files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod fetch;
pub mod input;
pub mod parse;
pub mod report;
pub mod url_builder;

mod user_agent;

// Re-export commonly used types
pub use config::{Config, ConfigError, ConfigOverrides};
pub use fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, FetchError, FetchOutcome, FetchResults,
    FetchSettings, Fetcher, FetcherError, RetryPolicy,
};
pub use input::{CsvLayout, Identifier, InputError, load_identifiers};
pub use parse::{ParsedResults, fetch_details, parse_results};
pub use report::{ReportError, read_results, write_parsed, write_results};
pub use url_builder::{TemplateError, UrlTemplate};
