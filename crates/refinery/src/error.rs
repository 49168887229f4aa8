//! Error types for the Refinery library.

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::ColumnType;

/// Main error type for Refinery operations.
#[derive(Debug, Error)]
pub enum RefineryError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from the Arrow library.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from the Parquet library.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File format not supported.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Columns of unequal length or duplicate names.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// Empty file or no data to process.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// A delimited row has more fields than the header.
    #[error("Row {row} has {found} fields, header has {expected}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Header-shift repair requires one column per canonical column.
    #[error("Cannot shift header: expected {expected} columns, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    /// A collapsed row split into a different number of fields than its header.
    #[error("Row {row} split into {found} fields, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Canonical columns still missing after structural repair.
    #[error("Schema did not converge after repair, missing columns: {}", missing.join(", "))]
    SchemaNotConverged { missing: Vec<String> },

    /// A cell could not be cast to the expected type.
    #[error("Cannot cast value '{value}' in column '{column}' (row {row}) to {target:?}")]
    Coercion {
        column: String,
        target: ColumnType,
        row: usize,
        value: String,
    },

    /// A column still has the wrong type after casting.
    #[error("Column '{column}' is {found:?} after casting, expected {expected:?}")]
    TypeNotConverged {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    /// Error saving or loading the audit trail or an output file.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Batch halted on the first failing file.
    #[error("Batch aborted at '{file}': {source}")]
    Aborted {
        file: PathBuf,
        #[source]
        source: Box<RefineryError>,
    },
}

impl RefineryError {
    /// Create an IO error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RefineryError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the dataset could not be brought to the
    /// canonical schema, as opposed to failing to read or write it.
    pub fn is_fatal_schema(&self) -> bool {
        matches!(
            self,
            RefineryError::ColumnCountMismatch { .. }
                | RefineryError::RaggedRow { .. }
                | RefineryError::SchemaNotConverged { .. }
                | RefineryError::Coercion { .. }
                | RefineryError::TypeNotConverged { .. }
        )
    }
}

/// Result type alias for Refinery operations.
pub type Result<T> = std::result::Result<T, RefineryError>;
