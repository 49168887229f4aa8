//! Writers for conformed tables.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::info;

use crate::audit::staging_path;
use crate::error::{RefineryError, Result};
use crate::input::{ColumnData, DataTable, SourceFormat};
use crate::schema::ColumnType;

/// Suffix appended to the source stem for every output file.
pub const OUTPUT_SUFFIX: &str = "_cleaning";

/// Destination for a source file: `<dest>/<stem>_cleaning.<ext>`.
///
/// # Example
///
/// ```
/// use refinery::output::output_path;
///
/// let path = output_path("silver", "bronze/week 1.parquet");
/// assert_eq!(path.to_string_lossy(), "silver/week 1_cleaning.parquet");
/// ```
pub fn output_path(dest_dir: impl AsRef<Path>, source: impl AsRef<Path>) -> PathBuf {
    let source = source.as_ref();
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    dest_dir.as_ref().join(name)
}

/// Writes tables in the format implied by the destination's extension.
pub struct Writer {
    delimiter: u8,
}

impl Writer {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Delimiter for delimited text outputs.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write `table` to `path`, staging to a hidden sibling and renaming it
    /// into place once complete.
    ///
    /// Overwrites whatever is at `path`; callers decide whether to write.
    pub fn write(&self, table: &DataTable, path: impl AsRef<Path>) -> Result<u64> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| RefineryError::io(parent, e))?;
            }
        }

        let temp_path = staging_path(path);
        let written = match format {
            SourceFormat::Parquet => write_parquet(table, &temp_path),
            SourceFormat::Csv => self.write_delimited(table, &temp_path),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, path).map_err(|e| {
            RefineryError::Persistence(format!(
                "Failed to rename {} -> {}: {}",
                temp_path.display(),
                path.display(),
                e
            ))
        })?;

        let rows = table.row_count() as u64;
        info!(path = %path.display(), rows, "wrote output");
        Ok(rows)
    }

    fn write_delimited(&self, table: &DataTable, path: &Path) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        writer.write_record(table.column_names())?;
        for row in 0..table.row_count() {
            writer.write_record(table.row_text(row))?;
        }
        writer.flush().map_err(|e| RefineryError::io(path, e))?;
        Ok(())
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

/// Arrow type used to store a column type.
pub fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Integer => DataType::Int64,
        ColumnType::Float => DataType::Float64,
        ColumnType::Text => DataType::Utf8,
    }
}

/// Convert a table into a single Arrow record batch.
pub fn to_record_batch(table: &DataTable) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.column_count());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.column_count());

    for (name, data) in table.columns() {
        fields.push(Field::new(name, arrow_type(data.column_type()), true));
        let array: ArrayRef = match data {
            ColumnData::Integer(values) => Arc::new(Int64Array::from(values.clone())),
            ColumnData::Float(values) => Arc::new(Float64Array::from(values.clone())),
            ColumnData::Text(values) => Arc::new(StringArray::from(values.clone())),
        };
        arrays.push(array);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?)
}

fn write_parquet(table: &DataTable, path: &Path) -> Result<()> {
    let batch = to_record_batch(table)?;
    let file = File::create(path).map_err(|e| RefineryError::io(path, e))?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}
