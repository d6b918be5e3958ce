//! Error types for the csvbind library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for csvbind operations.
///
/// Structural failures abort the current call. Per-cell conversion failures are
/// never reported through this type; they are collected into [`CellErrors`]
/// and handed back next to the populated record.
#[derive(Debug, Error)]
pub enum CsvBindError {
    /// The record passed to a decode/encode call does not fit the schema.
    #[error("Schema error: {0}")]
    Schema(String),

    /// One header label is claimed by a scalar column and a multi-span column.
    #[error("Conflicting column '{header}': claimed by both a scalar field and a multi-span sequence field")]
    ConflictingColumn { header: String },

    /// A data row has a different number of cells than the header row.
    #[error("Row length mismatch at line {line}: expected {expected} cells, found {found}")]
    RowLengthMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for csvbind operations.
pub type Result<T> = std::result::Result<T, CsvBindError>;

/// A single cell that could not be converted to its field's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellParseError {
    /// Physical line of the row in the source.
    pub line: u64,
    /// Header label of the column.
    pub column: String,
    /// Record field the cell was destined for.
    pub field: String,
    /// Raw cell text.
    pub value: String,
    /// Why the conversion failed.
    pub message: String,
}

impl fmt::Display for CellParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column '{}' (field '{}'): cannot convert {:?}: {}",
            self.line, self.column, self.field, self.value, self.message
        )
    }
}

impl std::error::Error for CellParseError {}

/// Multi-error holding every non-fatal cell failure of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellErrors {
    errors: Vec<CellParseError>,
}

impl CellErrors {
    /// Create an empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, error: CellParseError) {
        self.errors.push(error);
    }

    /// True when every cell of the row converted cleanly.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of failed cells.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterate over the individual failures.
    pub fn iter(&self) -> std::slice::Iter<'_, CellParseError> {
        self.errors.iter()
    }

    /// `Ok(())` when empty, otherwise the aggregate itself as the error.
    pub fn into_result(self) -> std::result::Result<(), CellErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for CellErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no cell errors"),
            1 => write!(f, "{}", self.errors[0]),
            n => {
                write!(f, "{} cell errors: ", n)?;
                for (i, err) in self.errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CellErrors {}

impl IntoIterator for CellErrors {
    type Item = CellParseError;
    type IntoIter = std::vec::IntoIter<CellParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a CellErrors {
    type Item = &'a CellParseError;
    type IntoIter = std::slice::Iter<'a, CellParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
