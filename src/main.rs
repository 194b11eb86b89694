//! CLI entry point for the creiq tool.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::Parser;
use creiq_core::{
    Config, FetchResults, Fetcher, fetch_details, load_identifiers, parse_results, read_results,
    write_parsed, write_results,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout carries only URLs and summaries
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    if let Some(path) = &args.summarize {
        let results = read_results(path)
            .with_context(|| format!("failed to read results from {}", path.display()))?;
        print_summary(&results);
        return Ok(());
    }

    // Parsing a saved results file needs neither the CSV nor the base URL
    let parse_saved_only = args.parse && args.input.is_some() && !args.print;
    let mut fetched = None;

    if !parse_saved_only {
        let config =
            Config::load(&args.env, &args.overrides()).context("invalid configuration")?;
        debug!(base_url = %config.base_url, layout = ?config.input, "configuration loaded");

        let ids = load_identifiers(&args.csv, &config.input)
            .with_context(|| format!("failed to load identifiers from {}", args.csv.display()))?;
        let urls = config.base_url.build_all(&ids);
        info!(identifiers = ids.len(), "URLs built");

        if args.print {
            println!("Base URL: {}", config.base_url);
            println!("Generated {} URLs:", urls.len());
            for url in &urls {
                println!("{url}");
            }
        }

        if args.fetch {
            let results = fetch_all(&config, &urls, args.quiet).await?;
            print_summary(&results);

            if let Some(output) = &args.output {
                write_results(output, &results)
                    .with_context(|| format!("failed to save results to {}", output.display()))?;
                println!("Results saved to {}", output.display());
            }
            fetched = Some(results);
        } else {
            if args.output.is_some() {
                warn!("--output has no effect without --fetch");
            }
            if !args.print && !args.parse {
                info!("Nothing to do. Use --print to list URLs or --fetch to retrieve them.");
                info!("Example: creiq --csv data/roll-number.csv --fetch -o results.json");
            }
        }
    }

    if args.parse {
        let results = match (&args.input, fetched) {
            (Some(path), _) => read_results(path)
                .with_context(|| format!("failed to read results from {}", path.display()))?,
            (None, Some(results)) => results,
            (None, None) => bail!("nothing to parse; pass --fetch or --input <FILE>"),
        };
        parse_pages(&args, &results).await?;
    }

    Ok(())
}

/// Parses fetched pages, optionally following appeal links, and saves them.
async fn parse_pages(args: &Args, results: &FetchResults) -> Result<()> {
    let mut parsed = parse_results(results);

    if args.fetch_details {
        let settings = Config::load_fetch_settings(&args.env, &args.overrides())
            .context("invalid configuration")?;
        let fetcher = Fetcher::new(settings).context("invalid fetch settings")?;

        let fetched = tokio::select! {
            fetched = fetch_details(&mut parsed, &fetcher, args.max_details) => {
                fetched.context("failed to start fetching appeal details")?
            }
            _ = tokio::signal::ctrl_c() => {
                bail!("interrupted; in-flight fetches were abandoned");
            }
        };
        println!("Fetched {fetched} appeal detail pages");
    }

    println!(
        "Parsed {} pages ({} appeals)",
        parsed.len(),
        parsed.appeal_count()
    );

    match &args.parsed_output {
        Some(path) => {
            write_parsed(path, &parsed)
                .with_context(|| format!("failed to save parsed results to {}", path.display()))?;
            println!("Parsed results saved to {}", path.display());
        }
        None => info!("Use --parsed-output <FILE> to save the parsed records."),
    }

    Ok(())
}

/// Runs the batch with a progress bar, abandoning it on Ctrl-C.
async fn fetch_all(config: &Config, urls: &[String], quiet: bool) -> Result<FetchResults> {
    let fetcher = Fetcher::new(config.fetch.clone()).context("invalid fetch settings")?;
    info!(
        urls = urls.len(),
        concurrency = config.fetch.concurrency,
        max_retries = config.fetch.retry.max_retries(),
        "fetching content"
    );

    let progress = progress_bar(urls.len(), quiet);
    let batch = fetcher.fetch_multiple_with_progress(urls.iter().cloned(), |url, outcome| {
        if !outcome.is_success() {
            progress.println(format!("failed: {url}"));
        }
        progress.inc(1);
    });

    let results = tokio::select! {
        results = batch => results.context("failed to start fetching")?,
        _ = tokio::signal::ctrl_c() => {
            progress.abandon_with_message("interrupted");
            bail!("interrupted; in-flight fetches were abandoned");
        }
    };
    progress.finish_and_clear();

    Ok(results)
}

fn progress_bar(len: usize, quiet: bool) -> ProgressBar {
    if quiet || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn print_summary(results: &FetchResults) {
    println!(
        "Fetch completed: {} successful, {} failed",
        results.succeeded(),
        results.failed()
    );
    for (url, reason) in results.failures() {
        println!("  {url}: {reason}");
    }
}
