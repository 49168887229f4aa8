//! Canonical schema and column types.

mod canonical;
mod types;

pub use canonical::{CanonicalColumn, CanonicalSchema};
pub use types::ColumnType;
