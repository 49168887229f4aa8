//! In-memory tabular data and source metadata.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{RefineryError, Result};
use crate::schema::ColumnType;

/// On-disk format of a source or output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    /// Determine the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "parquet" | "pq" => Ok(SourceFormat::Parquet),
            "csv" | "txt" => Ok(SourceFormat::Csv),
            "" => Err(RefineryError::UnsupportedFormat(format!(
                "'{}' has no extension",
                path.display()
            ))),
            other => Err(RefineryError::UnsupportedFormat(format!(
                "'.{}' ({})",
                other,
                path.display()
            ))),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::Parquet => "parquet",
            SourceFormat::Csv => "csv",
        }
    }
}

/// Metadata about a loaded source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format.
    pub format: SourceFormat,
    /// Number of data rows.
    pub row_count: usize,
    /// Number of columns as read.
    pub column_count: usize,
    /// When the file was loaded.
    pub loaded_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been loaded.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: SourceFormat,
        row_count: usize,
        column_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            row_count,
            column_count,
            loaded_at: Utc::now(),
        }
    }
}

/// Cells of one column, all of a single observed type. `None` is a null.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    /// Observed type of the column.
    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Integer(_) => ColumnType::Integer,
            ColumnData::Float(_) => ColumnType::Float,
            ColumnData::Text(_) => ColumnType::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render one cell as text. Nulls render as `None`.
    pub fn cell_text(&self, row: usize) -> Option<String> {
        match self {
            ColumnData::Integer(v) => v.get(row).copied().flatten().map(|n| n.to_string()),
            ColumnData::Float(v) => v.get(row).copied().flatten().map(format_float),
            ColumnData::Text(v) => v.get(row).cloned().flatten(),
        }
    }

    /// Stringify every cell. Lossless for all observed types.
    pub fn into_text(self) -> Vec<Option<String>> {
        match self {
            ColumnData::Integer(v) => v.into_iter().map(|c| c.map(|n| n.to_string())).collect(),
            ColumnData::Float(v) => v.into_iter().map(|c| c.map(format_float)).collect(),
            ColumnData::Text(v) => v,
        }
    }
}

/// Render a float the way the source exports do: whole values keep one
/// decimal place ("2.0"), everything else uses the shortest round-trip form.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// An in-memory table: ordered, uniquely named, equally long columns.
///
/// Tables loaded from a file also keep the header cells exactly as read,
/// before duplicate names were suffixed. Equality compares columns only.
#[derive(Debug, Clone, Default)]
pub struct DataTable {
    columns: IndexMap<String, ColumnData>,
    source_headers: Option<Vec<String>>,
}

impl PartialEq for DataTable {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl DataTable {
    /// Build a table from named columns, rejecting duplicate names and
    /// columns of unequal length.
    pub fn new(columns: Vec<(String, ColumnData)>) -> Result<Self> {
        let mut map = IndexMap::with_capacity(columns.len());
        let mut expected_len: Option<usize> = None;

        for (name, data) in columns {
            match expected_len {
                Some(len) if len != data.len() => {
                    return Err(RefineryError::InvalidTable(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        data.len(),
                        len
                    )));
                }
                None => expected_len = Some(data.len()),
                _ => {}
            }

            if map.contains_key(&name) {
                return Err(RefineryError::InvalidTable(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
            map.insert(name, data);
        }

        Ok(Self {
            columns: map,
            source_headers: None,
        })
    }

    /// Attach the header cells as they appeared in the source. Ignored
    /// unless there is exactly one per column.
    pub fn with_source_headers(mut self, headers: Vec<String>) -> Self {
        if headers.len() == self.columns.len() {
            self.source_headers = Some(headers);
        }
        self
    }

    /// Header cells as read from the source, in column order.
    pub fn source_headers(&self) -> Option<&[String]> {
        self.source_headers.as_deref()
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.columns.values().next().map(ColumnData::len).unwrap_or(0)
    }

    /// Column names in physical order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns.get(name)
    }

    /// Observed type of a column.
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.get(name).map(ColumnData::column_type)
    }

    /// Iterate columns in physical order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnData)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render a row as text cells, nulls as empty strings.
    pub fn row_text(&self, row: usize) -> Vec<String> {
        self.columns
            .values()
            .map(|c| c.cell_text(row).unwrap_or_default())
            .collect()
    }

    /// Keep only the named columns, in the given order.
    pub fn select<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut selected = IndexMap::new();
        let mut missing = Vec::new();

        for name in names {
            match self.columns.shift_remove(name) {
                Some(data) => {
                    selected.insert(name.to_string(), data);
                }
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(RefineryError::SchemaNotConverged { missing });
        }

        Ok(Self {
            columns: selected,
            source_headers: None,
        })
    }

    /// Consume the table, yielding its columns in order.
    pub fn into_columns(self) -> impl Iterator<Item = (String, ColumnData)> {
        self.columns.into_iter()
    }
}

/// Check if a value represents a missing/null value.
pub fn is_null_value(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("n/a")
        || trimmed.eq_ignore_ascii_case("nan")
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("none")
}
