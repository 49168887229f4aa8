//! Refinery: schema conformance and repair for hand-exported tabular files.
//!
//! Source files arrive with inconsistent structure. Some have correct
//! headers, some lost their header row, and some were exported with a
//! delimiter that collapses every row into a single text column. Refinery
//! detects which of these a file exhibits, repairs it, coerces every column
//! to the canonical type and records each decision in an audit trail.
//!
//! # Core Principles
//!
//! - **One schema**: every output has exactly the canonical columns and types
//! - **First write wins**: existing outputs are never overwritten
//! - **Full provenance**: every detection, repair and cast is recorded
//!
//! # Example
//!
//! ```no_run
//! use refinery::{BatchConfig, BatchDriver};
//!
//! let driver = BatchDriver::new(BatchConfig::default().with_filter("2025"));
//! let report = driver.run("data/bronze/intraday_prices", "data/silver/intraday_prices").unwrap();
//!
//! println!("Written: {}", report.written());
//! println!("Records: {}", report.trail.len());
//! ```

pub mod audit;
pub mod batch;
pub mod conform;
pub mod error;
pub mod input;
pub mod output;
pub mod schema;

pub use audit::{Action, AuditTrail, ConformanceRecord, Issue, Origin, Stage, Status};
pub use batch::{
    default_audit_path, list_files, run_batch, BatchConfig, BatchDriver, BatchReport, ErrorPolicy,
    FileOutcome, FileReport,
};
pub use conform::{detect, ConformanceEngine, Conformed, SchemaAnomaly, StructuralRepairer, TypeCoercer};
pub use error::{RefineryError, Result};
pub use input::{ColumnData, DataTable, Parser, ParserConfig, SourceFormat, SourceMetadata};
pub use output::{output_path, Writer};
pub use schema::{CanonicalColumn, CanonicalSchema, ColumnType};
