//! Structured data from fetched appeal pages.
//!
//! Two page kinds are recognized. A listing page, reached through a roll
//! number URL, carries property information and a table of appeals. A detail
//! page (`ComplaintDetail` in its path) carries labelled fields plus optional
//! hearing and decision tables. Parsing never fails; missing elements leave
//! fields empty.
//!
//! [`fetch_details`] follows the appeal-number links of listing pages, fetches
//! each detail page once and attaches the parsed detail to the link cell.
//!
//! # Example
//!
//! ```no_run
//! use creiq_core::parse::parse_results;
//! use creiq_core::read_results;
//! use std::path::Path;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let results = read_results(Path::new("results.json"))?;
//! let parsed = parse_results(&results);
//! println!("{} pages, {} appeals", parsed.len(), parsed.appeal_count());
//! # Ok(())
//! # }
//! ```

mod html;

use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::fetch::{FetchOutcome, FetchResults, Fetcher, FetcherError};

pub use html::{normalize_key, parse_appeal_detail, parse_appeal_listing};

/// Path marker of appeal detail pages.
const DETAIL_PAGE_MARKER: &str = "ComplaintDetail";

/// Property fields shown above the appeals table.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PropertyInfo {
    /// Roll number as displayed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    /// Free-text property description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_description: Option<String>,
}

/// One appeals table cell.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// A cell holding a link, with the detail page once fetched.
    Link {
        /// Cell text.
        text: String,
        /// The `href`, as written in the page.
        url: String,
        /// Parsed detail page, or why it is unavailable.
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Details>,
    },
    /// Plain cell text.
    Text(String),
}

/// One appeals table row, keyed by column header.
pub type Appeal = BTreeMap<String, Cell>;

/// A parsed listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AppealListing {
    /// Property fields.
    pub property_info: PropertyInfo,
    /// Appeals table rows in page order.
    pub appeals: Vec<Appeal>,
}

impl AppealListing {
    /// `(href, details)` of every link cell in an appeal-number column.
    fn appeal_links_mut(&mut self) -> impl Iterator<Item = (&mut String, &mut Option<Details>)> {
        self.appeals.iter_mut().flat_map(|appeal| {
            appeal
                .iter_mut()
                .filter(|(header, _)| is_appeal_number_header(header))
                .filter_map(|(_, cell)| match cell {
                    Cell::Link { url, details, .. } => Some((url, details)),
                    Cell::Text(_) => None,
                })
        })
    }
}

/// A parsed detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AppealDetail {
    /// Roll number, location and other property fields.
    pub property_information: BTreeMap<String, String>,
    /// Appellant, filing and status fields.
    pub appellant_information: BTreeMap<String, String>,
    /// Hearing table rows, if the page has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hearings: Option<Vec<BTreeMap<String, String>>>,
    /// Decision table rows, if the page has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decisions: Option<Vec<BTreeMap<String, String>>>,
}

/// Detail attached to an appeal link.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum Details {
    /// The detail page could not be fetched.
    Failed {
        /// Failure reason.
        error: String,
    },
    /// The parsed detail page.
    Parsed(AppealDetail),
}

/// One parsed page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum ParsedPage {
    /// A roll number listing page.
    Listing(AppealListing),
    /// An appeal detail page.
    Detail(AppealDetail),
}

impl ParsedPage {
    /// Parses `body` as the page kind its `url` indicates.
    #[must_use]
    pub fn from_page(url: &str, body: &str) -> Self {
        if is_detail_url(url) {
            Self::Detail(parse_appeal_detail(body))
        } else {
            Self::Listing(parse_appeal_listing(body))
        }
    }

    /// Appeals table rows; zero for detail pages.
    #[must_use]
    pub fn appeal_count(&self) -> usize {
        match self {
            Self::Listing(listing) => listing.appeals.len(),
            Self::Detail(_) => 0,
        }
    }
}

/// Parsed pages keyed by URL, in fetch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResults {
    pages: Vec<(String, ParsedPage)>,
}

impl ParsedResults {
    /// Number of parsed pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if nothing was parsed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Parsed page for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&ParsedPage> {
        self.pages
            .iter()
            .find(|(page_url, _)| page_url == url)
            .map(|(_, page)| page)
    }

    /// Appeals across all listing pages.
    #[must_use]
    pub fn appeal_count(&self) -> usize {
        self.pages.iter().map(|(_, page)| page.appeal_count()).sum()
    }

    /// Iterates `(url, page)` pairs in fetch order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParsedPage)> {
        self.pages.iter().map(|(url, page)| (url.as_str(), page))
    }
}

impl Serialize for ParsedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pages.len()))?;
        for (url, page) in &self.pages {
            map.serialize_entry(url, page)?;
        }
        map.end()
    }
}

/// Parses every successful page in `results`. Failed fetches are skipped.
#[must_use]
#[instrument(skip_all, fields(pages = results.len()))]
pub fn parse_results(results: &FetchResults) -> ParsedResults {
    let mut parsed = ParsedResults::default();
    for (url, outcome) in results.iter() {
        match outcome {
            FetchOutcome::Success(body) => {
                let page = ParsedPage::from_page(url, body);
                debug!(url, appeals = page.appeal_count(), "page parsed");
                parsed.pages.push((url.to_string(), page));
            }
            FetchOutcome::Failure(reason) => {
                warn!(url, %reason, "skipping page that failed to fetch");
            }
        }
    }
    info!(parsed = parsed.len(), appeals = parsed.appeal_count(), "parsing complete");
    parsed
}

/// Fetches the detail page behind each appeal-number link of the listing
/// pages in `parsed` and attaches the result to the link.
///
/// Links are resolved against their listing page URL and each distinct detail
/// URL is fetched once. With `limit`, only the first `limit` distinct detail
/// pages are fetched and later links are left without details. Returns the
/// number of detail pages fetched.
///
/// # Errors
///
/// Returns [`FetcherError::Client`] only if the session cannot be opened.
/// Per-link failures are attached as [`Details::Failed`].
#[instrument(skip_all, fields(limit = ?limit))]
pub async fn fetch_details(
    parsed: &mut ParsedResults,
    fetcher: &Fetcher,
    limit: Option<usize>,
) -> Result<usize, FetcherError> {
    let mut targets: Vec<String> = Vec::new();
    for (page_url, page) in &mut parsed.pages {
        let ParsedPage::Listing(listing) = page else {
            continue;
        };
        for (href, _) in listing.appeal_links_mut() {
            if let Some(target) = resolve_link(page_url, href) {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
    }
    if let Some(limit) = limit {
        targets.truncate(limit);
    }
    if targets.is_empty() {
        debug!("no appeal links to follow");
        return Ok(0);
    }

    info!(details = targets.len(), "fetching appeal details");
    let fetched = fetcher.fetch_multiple(targets).await?;

    for (page_url, page) in &mut parsed.pages {
        let ParsedPage::Listing(listing) = page else {
            continue;
        };
        for (href, details) in listing.appeal_links_mut() {
            let Some(target) = resolve_link(page_url, href) else {
                *details = Some(Details::Failed {
                    error: format!("invalid appeal link `{href}`"),
                });
                continue;
            };
            *details = fetched.get(&target).map(|outcome| match outcome {
                FetchOutcome::Success(body) => Details::Parsed(parse_appeal_detail(body)),
                FetchOutcome::Failure(reason) => Details::Failed {
                    error: reason.clone(),
                },
            });
        }
    }

    Ok(fetched.len())
}

fn is_detail_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().contains(DETAIL_PAGE_MARKER),
        Err(_) => url.contains(DETAIL_PAGE_MARKER),
    }
}

/// Matches headers such as `AppealNo` and `Appeal No.`.
fn is_appeal_number_header(header: &str) -> bool {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .eq("appealno".chars())
}

fn resolve_link(page_url: &str, href: &str) -> Option<String> {
    if href.trim().is_empty() {
        return None;
    }
    let base = Url::parse(page_url).ok()?;
    base.join(href.trim()).ok().map(String::from)
}
