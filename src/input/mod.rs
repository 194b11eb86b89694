//! Identifier loading from a delimited input file.
//!
//! By default the first row is a header and identifiers come from the first
//! column. A [`CsvLayout`] can name the column instead (matched ignoring case)
//! or declare the file headerless, in which case every row's first field is an
//! identifier. Values are trimmed and stripped of stray quotes and trailing
//! commas. Empty values are skipped and repeated identifiers are dropped,
//! keeping the first occurrence's position.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use creiq_core::input::{CsvLayout, load_identifiers};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let ids = load_identifiers(Path::new("data/roll-number.csv"), &CsvLayout::headerless())?;
//! for id in &ids {
//!     println!("{id}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, instrument};

pub use error::InputError;

/// Opaque, non-empty token read from one input record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Cleans `raw` and returns an identifier, or `None` if nothing is left.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().trim_matches('"').trim_matches(',').trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned.to_string()))
        }
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// How identifiers are laid out in the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvLayout {
    /// Whether the first row is a header row.
    pub has_header: bool,
    /// Header of the identifier column; `None` selects the first column.
    pub column: Option<String>,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            has_header: true,
            column: None,
        }
    }
}

impl CsvLayout {
    /// Every row is data; identifiers come from the first field.
    #[must_use]
    pub fn headerless() -> Self {
        Self {
            has_header: false,
            column: None,
        }
    }

    /// Header row present; identifiers come from the column named `column`.
    #[must_use]
    pub fn with_column(column: impl Into<String>) -> Self {
        Self {
            has_header: true,
            column: Some(column.into()),
        }
    }
}

/// Loads identifiers from the CSV file at `path`.
///
/// # Errors
///
/// Returns [`InputError::Io`] if the file cannot be opened,
/// [`InputError::Csv`] if it is malformed, [`InputError::MissingColumn`] if no
/// header matches the named column and [`InputError::ColumnWithoutHeader`] if
/// a column is named for a headerless file.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_identifiers(path: &Path, layout: &CsvLayout) -> Result<Vec<Identifier>, InputError> {
    let file = File::open(path).map_err(|e| InputError::io(path, e))?;
    let ids = read_identifiers(file, path, layout)?;
    info!(count = ids.len(), "loaded identifiers");
    Ok(ids)
}

/// Reads identifiers from any CSV source; `path` is used for error context only.
///
/// # Errors
///
/// Same as [`load_identifiers`], minus the file open.
pub fn read_identifiers<R: Read>(
    reader: R,
    path: &Path,
    layout: &CsvLayout,
) -> Result<Vec<Identifier>, InputError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(layout.has_header)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let index = match (&layout.column, layout.has_header) {
        (None, _) => 0,
        (Some(column), false) => {
            return Err(InputError::ColumnWithoutHeader {
                path: path.to_path_buf(),
                column: column.clone(),
            });
        }
        (Some(column), true) => {
            let headers = csv_reader.headers().map_err(|e| InputError::csv(path, e))?;
            find_column(headers, column)
                .ok_or_else(|| InputError::missing_column(path, column.as_str(), headers.iter()))?
        }
    };
    debug!(index, has_header = layout.has_header, "identifier column located");

    let first_data_row = if layout.has_header { 2 } else { 1 };
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| InputError::csv(path, e))?;
        let row = row + first_data_row;
        match record.get(index).and_then(Identifier::new) {
            Some(id) => {
                if seen.insert(id.clone()) {
                    ids.push(id);
                } else {
                    debug!(row, id = %id, "skipping duplicate identifier");
                }
            }
            None => debug!(row, "skipping row without identifier"),
        }
    }
    Ok(ids)
}

/// Finds a header by name, ignoring case and surrounding whitespace.
fn find_column(headers: &csv::StringRecord, column: &str) -> Option<usize> {
    let wanted = column.trim();
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(wanted))
}
