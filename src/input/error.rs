//! Error types for identifier loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading identifiers. All of them are fatal to a run.
#[derive(Debug, Error)]
pub enum InputError {
    /// The input file is missing or unreadable.
    #[error("cannot read input file {path}: {source}")]
    Io {
        /// The input file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be parsed as delimited text.
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        /// The input file path.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// No header matches the configured identifier column.
    #[error("column `{column}` not found in {path} (headers: {found})")]
    MissingColumn {
        /// The input file path.
        path: PathBuf,
        /// The configured column name.
        column: String,
        /// Comma-separated headers that were present.
        found: String,
    },

    /// A column was named but the file is read without a header row.
    #[error("column `{column}` cannot be located in {path}: the file is read without a header row")]
    ColumnWithoutHeader {
        /// The input file path.
        path: PathBuf,
        /// The configured column name.
        column: String,
    },
}

impl InputError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV parse error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }

    /// Creates a missing column error listing the headers that were found.
    pub fn missing_column<'a>(
        path: impl Into<PathBuf>,
        column: impl Into<String>,
        found: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let found = found.into_iter().collect::<Vec<_>>().join(", ");
        Self::MissingColumn {
            path: path.into(),
            column: column.into(),
            found: if found.is_empty() {
                "none".to_string()
            } else {
                found
            },
        }
    }
}
