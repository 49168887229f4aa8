//! Input loading and the in-memory table model.

mod parser;
mod source;

pub use parser::{Parser, ParserConfig};
pub use source::{format_float, is_null_value, ColumnData, DataTable, SourceFormat, SourceMetadata};
