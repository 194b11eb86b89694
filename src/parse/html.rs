//! Field extraction from appeal listing and appeal detail pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{Appeal, AppealDetail, AppealListing, Cell, PropertyInfo};

/// Compiles a selector at static init; panics on invalid CSS.
fn compile_static_selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid static selector '{css}': {e}"))
}

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static ROLL_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".col-md-3 + .col-md-3"));
static ROW_VALUE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector(".row .col-md-3 + .col-md-3"));
static APPEALS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("#MainContent_GridView1"));
static HEARINGS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("#MainContent_GVHearing"));
static DECISIONS_TABLE: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("#MainContent_GVDecision"));
static HEADER_CELLS: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("tr:first-child th"));
static BODY_ROWS: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("tr:not(:first-child)"));
static DATA_CELL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));
static DETAIL_ROLL_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("#MainContent_LinkButton1"));
static ROW: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(".row"));
static FIELD_COLUMN: LazyLock<Selector> = LazyLock::new(|| compile_static_selector(".col-md-4"));
static STRONG: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("strong"));

static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"[^a-zA-Z0-9]+"));

/// Detail-page keys filed under appellant information. Everything else is
/// property information.
const APPELLANT_KEYS: &[&str] = &[
    "name1",
    "name_of_representative",
    "filing_date",
    "tax_date",
    "section",
    "reason_for_appeal",
    "status",
];

/// Extracts property information and the appeals table from a listing page.
///
/// Missing elements leave the matching fields empty; this never fails.
#[must_use]
pub fn parse_appeal_listing(html: &str) -> AppealListing {
    let document = Html::parse_document(html);

    let property_info = PropertyInfo {
        roll_number: document.select(&ROLL_NUMBER).next().map(text_of),
        property_description: document.select(&ROW_VALUE).nth(1).map(text_of),
    };

    let appeals: Vec<Appeal> = document
        .select(&APPEALS_TABLE)
        .next()
        .map(|table| {
            table_rows(table)
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(header, cell)| (header, listing_cell(cell)))
                        .collect()
                })
                .collect()
        })
        .unwrap_or_default();

    AppealListing {
        property_info,
        appeals,
    }
}

/// Extracts labelled fields and the hearing and decision tables from a
/// detail page.
#[must_use]
pub fn parse_appeal_detail(html: &str) -> AppealDetail {
    let document = Html::parse_document(html);
    let mut detail = AppealDetail::default();

    if let Some(link) = document.select(&DETAIL_ROLL_NUMBER).next() {
        detail
            .property_information
            .insert("roll_number".to_string(), text_of(link));
    }

    for row in document.select(&ROW) {
        let mut columns = row.select(&FIELD_COLUMN);
        let (Some(label_col), Some(value_col)) = (columns.next(), columns.next()) else {
            continue;
        };

        let label = label_col.select(&STRONG).next().unwrap_or(label_col);
        let label = text_of(label);
        let label = label.trim_end_matches(':');
        let value = text_of(value_col);

        if value.is_empty() || label.to_lowercase().starts_with("note") {
            continue;
        }

        let key = normalize_key(label);
        if APPELLANT_KEYS.contains(&key.as_str()) {
            detail.appellant_information.insert(key, value);
        } else {
            detail.property_information.insert(key, value);
        }
    }

    detail.hearings = document.select(&HEARINGS_TABLE).next().map(text_table);
    detail.decisions = document.select(&DECISIONS_TABLE).next().map(text_table);
    detail
}

/// Lowercase snake case: runs of non-alphanumerics become one `_`, and
/// leading or trailing underscores are dropped.
#[must_use]
pub fn normalize_key(label: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(label, "_")
        .to_lowercase()
        .trim_matches('_')
        .to_string()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Pairs each data cell with the header in the same position. Cells past the
/// last header are dropped, as are rows with no cells.
fn table_rows(table: ElementRef<'_>) -> Vec<Vec<(String, ElementRef<'_>)>> {
    let headers: Vec<String> = table.select(&HEADER_CELLS).map(text_of).collect();

    table
        .select(&BODY_ROWS)
        .map(|row| {
            headers
                .iter()
                .cloned()
                .zip(row.select(&DATA_CELL))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

fn text_table(table: ElementRef<'_>) -> Vec<BTreeMap<String, String>> {
    table_rows(table)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(header, cell)| (normalize_key(&header), text_of(cell)))
                .collect()
        })
        .collect()
}

fn listing_cell(cell: ElementRef<'_>) -> Cell {
    let text = text_of(cell);
    match cell.select(&LINK).next() {
        Some(link) => Cell::Link {
            text,
            url: link.value().attr("href").unwrap_or_default().to_string(),
            details: None,
        },
        None => Cell::Text(text),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::parse::Details;

    const LISTING: &str = r#"
        <html><body>
          <div class="row">
            <div class="col-md-3"><strong>Roll Number:</strong></div>
            <div class="col-md-3">1234567890</div>
          </div>
          <div class="row">
            <div class="col-md-3"><strong>Property Description:</strong></div>
            <div class="col-md-3">123 MAIN ST</div>
          </div>
          <table id="MainContent_GridView1">
            <tr><th>AppealNo</th><th>Tax Year</th><th>Status</th></tr>
            <tr>
              <td><a href="ComplaintDetail?AppealNo=2023-001">2023-001</a></td>
              <td>2023</td>
              <td> Scheduled </td>
            </tr>
            <tr>
              <td><a href="ComplaintDetail?AppealNo=2024-002">2024-002</a></td>
              <td>2024</td>
              <td>Closed</td>
            </tr>
          </table>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
          <a id="MainContent_LinkButton1"> 1234567890 </a>
          <div class="row">
            <div class="col-md-4"><strong>Appeal Number:</strong></div>
            <div class="col-md-4">2023-001</div>
          </div>
          <div class="row">
            <div class="col-md-4">Municipality:</div>
            <div class="col-md-4">Toronto</div>
          </div>
          <div class="row">
            <div class="col-md-4"><strong>Name1:</strong></div>
            <div class="col-md-4">ACME HOLDINGS</div>
          </div>
          <div class="row">
            <div class="col-md-4"><strong>Reason for Appeal:</strong></div>
            <div class="col-md-4">Overvalued</div>
          </div>
          <div class="row">
            <div class="col-md-4"><strong>Notes:</strong></div>
            <div class="col-md-4">internal</div>
          </div>
          <div class="row">
            <div class="col-md-4"><strong>Section:</strong></div>
            <div class="col-md-4">  </div>
          </div>
          <div class="row">
            <div class="col-md-4"><strong>Lot Size:</strong></div>
            <div class="col-md-4">40 x 120</div>
          </div>
          <table id="MainContent_GVHearing">
            <tr><th>Hearing Date</th><th>Hearing Type</th></tr>
            <tr><td>2024-03-01</td><td>Settlement</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("Reason for Appeal"), "reason_for_appeal");
        assert_eq!(normalize_key("Location/Property Description"), "location_property_description");
        assert_eq!(normalize_key("  Tax Date: "), "tax_date");
        assert_eq!(normalize_key("NBHD"), "nbhd");
        assert_eq!(normalize_key("---"), "");
    }

    #[test]
    fn test_listing_property_info() {
        let listing = parse_appeal_listing(LISTING);
        assert_eq!(listing.property_info.roll_number.as_deref(), Some("1234567890"));
        assert_eq!(
            listing.property_info.property_description.as_deref(),
            Some("123 MAIN ST")
        );
    }

    #[test]
    fn test_listing_appeals_table() {
        let listing = parse_appeal_listing(LISTING);
        assert_eq!(listing.appeals.len(), 2);

        let first = &listing.appeals[0];
        assert_eq!(
            first.get("AppealNo"),
            Some(&Cell::Link {
                text: "2023-001".to_string(),
                url: "ComplaintDetail?AppealNo=2023-001".to_string(),
                details: None,
            })
        );
        assert_eq!(first.get("Tax Year"), Some(&Cell::Text("2023".to_string())));
        assert_eq!(first.get("Status"), Some(&Cell::Text("Scheduled".to_string())));
        assert_eq!(
            listing.appeals[1].get("Status"),
            Some(&Cell::Text("Closed".to_string()))
        );
    }

    #[test]
    fn test_listing_without_table_or_info_is_empty() {
        let listing = parse_appeal_listing("<html><body><p>No appeals</p></body></html>");
        assert!(listing.appeals.is_empty());
        assert_eq!(listing.property_info, PropertyInfo::default());
    }

    #[test]
    fn test_listing_drops_cells_beyond_headers_and_empty_rows() {
        let html = r#"
            <table id="MainContent_GridView1">
              <tr><th>AppealNo</th></tr>
              <tr><td>1</td><td>extra</td></tr>
              <tr></tr>
            </table>
        "#;
        let listing = parse_appeal_listing(html);
        assert_eq!(listing.appeals.len(), 1);
        assert_eq!(listing.appeals[0].len(), 1);
    }

    #[test]
    fn test_detail_fields_are_categorized() {
        let detail = parse_appeal_detail(DETAIL);

        assert_eq!(
            detail.property_information.get("roll_number").map(String::as_str),
            Some("1234567890")
        );
        assert_eq!(
            detail.property_information.get("appeal_number").map(String::as_str),
            Some("2023-001")
        );
        assert_eq!(
            detail.property_information.get("municipality").map(String::as_str),
            Some("Toronto")
        );
        assert_eq!(
            detail.property_information.get("lot_size").map(String::as_str),
            Some("40 x 120")
        );
        assert_eq!(
            detail.appellant_information.get("name1").map(String::as_str),
            Some("ACME HOLDINGS")
        );
        assert_eq!(
            detail.appellant_information.get("reason_for_appeal").map(String::as_str),
            Some("Overvalued")
        );
    }

    #[test]
    fn test_detail_skips_notes_and_empty_values() {
        let detail = parse_appeal_detail(DETAIL);
        assert!(!detail.property_information.contains_key("notes"));
        assert!(!detail.appellant_information.contains_key("section"));
    }

    #[test]
    fn test_detail_tables() {
        let detail = parse_appeal_detail(DETAIL);

        let hearings = detail.hearings.unwrap();
        assert_eq!(hearings.len(), 1);
        assert_eq!(hearings[0].get("hearing_date").map(String::as_str), Some("2024-03-01"));
        assert_eq!(hearings[0].get("hearing_type").map(String::as_str), Some("Settlement"));
        assert!(detail.decisions.is_none());
    }

    #[test]
    fn test_detail_serializes_like_saved_documents() {
        let detail = parse_appeal_detail(DETAIL);
        let json = serde_json::to_value(Details::Parsed(detail)).unwrap();
        assert_eq!(json["appellant_information"]["name1"], "ACME HOLDINGS");
        assert_eq!(json["hearings"][0]["hearing_type"], "Settlement");
        assert!(json.get("decisions").is_none());
    }
}
