//! Run configuration from a dotenv-style file, the environment and CLI overrides.
//!
//! Precedence, highest first: CLI overrides, the process environment, the env
//! file (default `.env`). A variable already exported in the environment wins
//! over the same key in the file. The process environment is read but never
//! modified.
//!
//! | Key | Meaning | Default |
//! |-----|---------|---------|
//! | `URL` | base URL template (required) | - |
//! | `CREIQ_TIMEOUT_SECS` | per-attempt timeout, 1..=3600 | 30 |
//! | `CREIQ_MAX_RETRIES` | retries after the first attempt, 0..=10 | 3 |
//! | `CREIQ_RETRY_DELAY_MS` | fixed delay between attempts, 0..=60000 | 1000 |
//! | `CREIQ_CONCURRENCY` | fetches in flight, 1..=32 | 4 |
//! | `CREIQ_RATE_LIMIT_MS` | per-host spacing, 0..=60000 | 500 |
//! | `CREIQ_USER_AGENT` | User-Agent header | `creiq/<version>` |
//! | `CREIQ_CSV_HEADER` | whether the input has a header row | `true` |
//! | `CREIQ_ID_COLUMN` | identifier column header | first column |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::fetch::{
    DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT, DEFAULT_RETRY_DELAY,
    DEFAULT_TIMEOUT, FetchSettings, MAX_CONCURRENCY, MIN_CONCURRENCY, RetryPolicy,
};
use crate::input::CsvLayout;
use crate::url_builder::{TemplateError, UrlTemplate};

/// Key holding the base URL template.
pub const BASE_URL_KEY: &str = "URL";
const TIMEOUT_KEY: &str = "CREIQ_TIMEOUT_SECS";
const MAX_RETRIES_KEY: &str = "CREIQ_MAX_RETRIES";
const RETRY_DELAY_KEY: &str = "CREIQ_RETRY_DELAY_MS";
const CONCURRENCY_KEY: &str = "CREIQ_CONCURRENCY";
const RATE_LIMIT_KEY: &str = "CREIQ_RATE_LIMIT_MS";
const USER_AGENT_KEY: &str = "CREIQ_USER_AGENT";
const CSV_HEADER_KEY: &str = "CREIQ_CSV_HEADER";
const ID_COLUMN_KEY: &str = "CREIQ_ID_COLUMN";

/// Largest accepted retry count.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Largest accepted delay or spacing in milliseconds.
pub const MAX_DELAY_MS: u64 = 60_000;

/// Configuration errors. All are fatal and raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The base URL template is not set anywhere.
    #[error("required configuration value `{key}` is not set (env file or environment)")]
    MissingBaseUrl {
        /// The key that was looked up.
        key: &'static str,
    },

    /// The base URL template is set but unusable.
    #[error("invalid `{key}` value: {source}")]
    BaseUrl {
        /// The key that was looked up.
        key: &'static str,
        /// Why the template was rejected.
        #[source]
        source: TemplateError,
    },

    /// A value failed to parse or is out of range.
    #[error("invalid `{key}` value `{value}`: {reason}")]
    InvalidValue {
        /// The offending key.
        key: &'static str,
        /// The raw value.
        value: String,
        /// What was expected.
        reason: String,
    },

    /// The env file exists but could not be read or parsed.
    #[error("cannot load env file {path}: {source}")]
    EnvFile {
        /// The env file path.
        path: PathBuf,
        /// The underlying dotenv error.
        #[source]
        source: dotenvy::Error,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Values given on the command line; `None` leaves the configured value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Retries after the first attempt.
    pub max_retries: Option<u32>,
    /// Fetches in flight.
    pub concurrency: Option<usize>,
    /// Per-host spacing in milliseconds.
    pub rate_limit_ms: Option<u64>,
    /// Whether the input file has a header row.
    pub has_header: Option<bool>,
    /// Identifier column header.
    pub id_column: Option<String>,
}

/// Validated run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL template.
    pub base_url: UrlTemplate,
    /// Settings for the fetcher.
    pub fetch: FetchSettings,
    /// Where identifiers sit in the input file.
    pub input: CsvLayout,
}

impl Config {
    /// Loads configuration from the process environment and `env_file`.
    ///
    /// A missing env file is not an error; the environment alone may suffice.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvFile`] for an unreadable or malformed env file,
    /// and any validation error from [`Config::from_lookup`].
    pub fn load(env_file: &Path, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::load_with_env(env_file, overrides, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading exported variables through `process_env`.
    ///
    /// A non-blank value from `process_env` wins over the same key in the file.
    ///
    /// # Errors
    ///
    /// Same as [`Config::load`].
    #[instrument(skip(overrides, process_env), fields(env_file = %env_file.display()))]
    pub fn load_with_env<E>(
        env_file: &Path,
        overrides: &ConfigOverrides,
        process_env: E,
    ) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let file_vars = read_env_file(env_file)?;
        Self::from_lookup(layered(&process_env, &file_vars), overrides)
    }

    /// Resolves only the fetch settings; `URL` is not required.
    ///
    /// Used when fetching links found in saved pages rather than built URLs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvFile`] or [`ConfigError::InvalidValue`].
    pub fn load_fetch_settings(
        env_file: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<FetchSettings, ConfigError> {
        let file_vars = read_env_file(env_file)?;
        let process_env = |key: &str| std::env::var(key).ok();
        let lookup = layered(&process_env, &file_vars);
        fetch_settings(&|key: &str| non_blank(lookup(key)), overrides)
    }

    /// Builds and validates configuration from a key lookup plus overrides.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingBaseUrl`] when `URL` is unset, and
    /// [`ConfigError::BaseUrl`] or [`ConfigError::InvalidValue`] for bad values.
    pub fn from_lookup<F>(lookup: F, overrides: &ConfigOverrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let raw_url = get(BASE_URL_KEY).ok_or(ConfigError::MissingBaseUrl { key: BASE_URL_KEY })?;
        let base_url = UrlTemplate::parse(&raw_url).map_err(|source| ConfigError::BaseUrl {
            key: BASE_URL_KEY,
            source,
        })?;

        let config = Self {
            base_url,
            fetch: fetch_settings(&get, overrides)?,
            input: csv_layout(&get, overrides)?,
        };
        debug!(?config, "configuration resolved");
        Ok(config)
    }
}

/// Process environment first, then the env file.
fn layered<'a, E>(
    process_env: &'a E,
    file_vars: &'a HashMap<String, String>,
) -> impl Fn(&str) -> Option<String> + 'a
where
    E: Fn(&str) -> Option<String>,
{
    move |key: &str| non_blank(process_env(key)).or_else(|| file_vars.get(key).cloned())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn fetch_settings(
    get: &dyn Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<FetchSettings, ConfigError> {
    let timeout_secs = match overrides.timeout_secs {
        Some(value) => value,
        None => parse_or(TIMEOUT_KEY, get(TIMEOUT_KEY), DEFAULT_TIMEOUT.as_secs())?,
    };
    ensure_range(TIMEOUT_KEY, timeout_secs, 1, 3600)?;

    let max_retries = match overrides.max_retries {
        Some(value) => value,
        None => parse_or(MAX_RETRIES_KEY, get(MAX_RETRIES_KEY), DEFAULT_MAX_RETRIES)?,
    };
    ensure_range(MAX_RETRIES_KEY, max_retries, 0, MAX_RETRIES_LIMIT)?;

    let retry_delay_ms =
        parse_or(RETRY_DELAY_KEY, get(RETRY_DELAY_KEY), millis(DEFAULT_RETRY_DELAY))?;
    ensure_range(RETRY_DELAY_KEY, retry_delay_ms, 0, MAX_DELAY_MS)?;

    let concurrency = match overrides.concurrency {
        Some(value) => value,
        None => parse_or(CONCURRENCY_KEY, get(CONCURRENCY_KEY), DEFAULT_CONCURRENCY)?,
    };
    ensure_range(CONCURRENCY_KEY, concurrency, MIN_CONCURRENCY, MAX_CONCURRENCY)?;

    let rate_limit_ms = match overrides.rate_limit_ms {
        Some(value) => value,
        None => parse_or(RATE_LIMIT_KEY, get(RATE_LIMIT_KEY), millis(DEFAULT_RATE_LIMIT))?,
    };
    ensure_range(RATE_LIMIT_KEY, rate_limit_ms, 0, MAX_DELAY_MS)?;

    let user_agent = match get(USER_AGENT_KEY) {
        Some(ua) => ua.trim().to_string(),
        None => FetchSettings::default().user_agent,
    };

    Ok(FetchSettings {
        timeout: Duration::from_secs(timeout_secs),
        retry: RetryPolicy::new(max_retries, Duration::from_millis(retry_delay_ms)),
        concurrency,
        rate_limit: Duration::from_millis(rate_limit_ms),
        user_agent,
    })
}

fn csv_layout(
    get: &dyn Fn(&str) -> Option<String>,
    overrides: &ConfigOverrides,
) -> Result<CsvLayout, ConfigError> {
    let has_header = match overrides.has_header {
        Some(value) => value,
        None => match get(CSV_HEADER_KEY) {
            Some(raw) => parse_bool(CSV_HEADER_KEY, &raw)?,
            None => true,
        },
    };

    let column = overrides
        .id_column
        .clone()
        .filter(|column| !column.trim().is_empty())
        .or_else(|| get(ID_COLUMN_KEY))
        .map(|column| column.trim().to_string());

    if let (false, Some(column)) = (has_header, &column) {
        return Err(ConfigError::invalid(
            ID_COLUMN_KEY,
            column.clone(),
            "a named column needs a header row",
        ));
    }

    Ok(CsvLayout { has_header, column })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, raw, "expected true or false")),
    }
}

/// Reads `KEY=value` pairs from a dotenv file without touching the environment.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let env_error = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            debug!(path = %path.display(), "env file not found, using environment only");
            return Ok(HashMap::new());
        }
        Err(e) => return Err(env_error(e)),
    };

    iter.map(|item| item.map_err(env_error)).collect()
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, raw.clone(), e.to_string())),
    }
}

fn ensure_range<T>(key: &'static str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if value < min || value > max {
        return Err(ConfigError::invalid(
            key,
            value.to_string(),
            format!("expected range {min}..={max}"),
        ));
    }
    Ok(())
}
