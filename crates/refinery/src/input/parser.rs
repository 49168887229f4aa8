//! Loaders for Parquet and delimited text files.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast_with_options, CastOptions};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::source::{is_null_value, ColumnData, DataTable, SourceFormat, SourceMetadata};
use crate::error::{RefineryError, Result};

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Field delimiter for delimited text files. Never auto-detected: a
    /// file exported with a different delimiter must surface as a collapsed
    /// single column so it can be repaired and audited.
    pub delimiter: u8,
    /// Quote character.
    pub quote: u8,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            max_rows: None,
        }
    }
}

/// Loads tabular files into a [`DataTable`].
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Load a file and return the data table and metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(DataTable, SourceMetadata)> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;

        let mut contents = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut contents))
            .map_err(|e| RefineryError::io(path, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let size_bytes = contents.len() as u64;
        let table = match format {
            SourceFormat::Parquet => self.parse_parquet(Bytes::from(contents))?,
            SourceFormat::Csv => self.parse_delimited(&contents)?,
        };

        debug!(
            path = %path.display(),
            rows = table.row_count(),
            columns = table.column_count(),
            "loaded source file"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            table.row_count(),
            table.column_count(),
        );

        Ok((table, metadata))
    }

    /// Read Parquet bytes through their Arrow record batches.
    fn parse_parquet(&self, contents: Bytes) -> Result<DataTable> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(contents)?;

        let fields: Vec<(String, DataType)> = builder
            .schema()
            .fields()
            .iter()
            .map(|f| (f.name().clone(), f.data_type().clone()))
            .collect();
        if fields.is_empty() {
            return Err(RefineryError::EmptyData("No columns found".to_string()));
        }

        let mut columns: Vec<ColumnData> = fields
            .iter()
            .map(|(_, data_type)| empty_column_for(data_type))
            .collect();

        let reader = builder.build()?;
        let mut rows_read = 0usize;
        for batch in reader {
            let batch = batch?;
            let take = match self.config.max_rows {
                Some(max) => batch.num_rows().min(max.saturating_sub(rows_read)),
                None => batch.num_rows(),
            };
            for (column, array) in columns.iter_mut().zip(batch.columns()) {
                append_array(column, &array.slice(0, take))?;
            }
            rows_read += take;
            if self.config.max_rows.is_some_and(|max| rows_read >= max) {
                break;
            }
        }

        let raw: Vec<String> = fields.into_iter().map(|(name, _)| name).collect();
        let headers = unique_headers(raw.iter().cloned());
        Ok(DataTable::new(headers.into_iter().zip(columns).collect())?.with_source_headers(raw))
    }

    /// Parse delimited text. The first record is always taken as the header.
    fn parse_delimited(&self, bytes: &[u8]) -> Result<DataTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(true)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(RefineryError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); expected_cols];

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            if record.len() > expected_cols {
                return Err(RefineryError::MalformedRow {
                    row: row_idx,
                    expected: expected_cols,
                    found: record.len(),
                });
            }
            for (col, values) in cells.iter_mut().enumerate() {
                // Short rows are padded with nulls
                values.push(record.get(col).unwrap_or("").to_string());
            }
        }

        let names = unique_headers(headers.iter().cloned());
        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| (name, infer_column(values)))
            .collect();

        Ok(DataTable::new(columns)?.with_source_headers(headers))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Infer the narrowest column type that holds every non-null value.
fn infer_column(values: Vec<String>) -> ColumnData {
    let non_null = || values.iter().filter(|v| !is_null_value(v)).map(|v| v.trim());

    if non_null().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnData::Integer(
            values
                .iter()
                .map(|v| v.trim().parse::<i64>().ok())
                .collect(),
        );
    }

    if non_null().all(|v| v.parse::<f64>().is_ok()) {
        return ColumnData::Float(
            values
                .iter()
                .map(|v| {
                    if is_null_value(v) {
                        None
                    } else {
                        v.trim().parse::<f64>().ok()
                    }
                })
                .collect(),
        );
    }

    ColumnData::Text(
        values
            .into_iter()
            .map(|v| if is_null_value(&v) { None } else { Some(v) })
            .collect(),
    )
}

/// Suffix repeated header names with `.1`, `.2`, ... so every column stays
/// addressable by name.
fn unique_headers(headers: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for header in headers {
        let mut candidate = header.clone();
        let mut n = 1;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{}.{}", header, n);
            n += 1;
        }
        out.push(candidate);
    }

    out
}

fn empty_column_for(data_type: &DataType) -> ColumnData {
    if data_type.is_integer() {
        ColumnData::Integer(Vec::new())
    } else if data_type.is_floating() {
        ColumnData::Float(Vec::new())
    } else {
        ColumnData::Text(Vec::new())
    }
}

/// Append an Arrow array to a column, widening to the column's type.
///
/// Casts are strict: a value the target type cannot hold is an error, never
/// a null.
fn append_array(column: &mut ColumnData, array: &ArrayRef) -> Result<()> {
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    match column {
        ColumnData::Integer(values) => {
            let cast_array = cast_with_options(array, &DataType::Int64, &options)?;
            values.extend(cast_array.as_primitive::<Int64Type>().iter());
        }
        ColumnData::Float(values) => {
            let cast_array = cast_with_options(array, &DataType::Float64, &options)?;
            values.extend(cast_array.as_primitive::<Float64Type>().iter());
        }
        ColumnData::Text(values) => {
            let cast_array = cast_with_options(array, &DataType::Utf8, &options)?;
            let strings = cast_array.as_string::<i32>();
            values.extend(strings.iter().map(|v| v.map(str::to_string)));
        }
    }
    Ok(())
}
