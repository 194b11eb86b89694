//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use creiq_core::ConfigOverrides;

/// Load property roll numbers and fetch their appeal pages.
///
/// Reads identifiers from a CSV file, builds one URL per identifier from the
/// base URL configured under `URL` in the env file, and optionally fetches
/// every URL with timeout and retry. Fetched pages, or a saved results file,
/// can be parsed into property and appeal records.
#[derive(Parser, Debug)]
#[command(name = "creiq")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// CSV file holding one identifier per row
    #[arg(long, value_name = "FILE", default_value = "data/roll-number.csv")]
    pub csv: PathBuf,

    /// Env file holding the base URL under the `URL` key
    #[arg(long, value_name = "FILE", default_value = ".env")]
    pub env: PathBuf,

    /// Header of the identifier column (default: first column)
    #[arg(long, value_name = "NAME", conflicts_with = "no_header")]
    pub column: Option<String>,

    /// Treat every CSV row as data; identifiers come from the first field
    #[arg(long)]
    pub no_header: bool,

    /// Print the base URL and every generated URL
    #[arg(long)]
    pub print: bool,

    /// Fetch content from every generated URL
    #[arg(long)]
    pub fetch: bool,

    /// Save fetch results as JSON to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-attempt timeout in seconds (1-3600)
    #[arg(short = 't', long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Maximum retry attempts after the first failure (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub retries: Option<u8>,

    /// Maximum concurrent fetches (1-32)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub concurrency: Option<u8>,

    /// Minimum delay between requests to the same host in milliseconds (0 to disable, max 60000)
    #[arg(short = 'l', long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub rate_limit: Option<u64>,

    /// Parse fetched pages into property and appeal records
    #[arg(long)]
    pub parse: bool,

    /// Saved results file to parse instead of fetching
    #[arg(long, value_name = "FILE", requires = "parse", conflicts_with = "fetch")]
    pub input: Option<PathBuf>,

    /// Fetch and parse the detail page behind each appeal number link
    #[arg(long, requires = "parse")]
    pub fetch_details: bool,

    /// Fetch at most this many appeal detail pages
    #[arg(long, value_name = "N", requires = "fetch_details")]
    pub max_details: Option<usize>,

    /// Save parsed records as JSON to this file
    #[arg(long, value_name = "FILE", requires = "parse")]
    pub parsed_output: Option<PathBuf>,

    /// Print counts and failures from a saved results file, then exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["print", "fetch", "parse"])]
    pub summarize: Option<PathBuf>,
}

impl Args {
    /// Settings given on the command line, layered over the env file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            timeout_secs: self.timeout,
            max_retries: self.retries.map(u32::from),
            concurrency: self.concurrency.map(usize::from),
            rate_limit_ms: self.rate_limit,
            has_header: self.no_header.then_some(false),
            id_column: self.column.clone(),
        }
    }
}
