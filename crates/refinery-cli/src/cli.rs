//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use refinery::ErrorPolicy;
use std::path::PathBuf;

/// Refinery: conform hand-exported tabular files to the canonical schema
#[derive(Parser)]
#[command(name = "refinery")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Conform every file in a directory and write the audit document
    Clean {
        /// Directory of source files (Parquet/CSV)
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Directory for conformed outputs
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Only process files whose path contains this substring
        #[arg(short, long, env = "REFINERY_FILTER")]
        filter: Option<String>,

        /// Audit document path (default: <DEST>/../metadata/cleaning_metadata.json)
        #[arg(short, long, env = "REFINERY_AUDIT")]
        audit: Option<PathBuf>,

        /// Layer label written into audit records
        #[arg(long, env = "REFINERY_LAYER", default_value = "silver")]
        layer: String,

        /// What to do when a file fails (continue, abort)
        #[arg(long, default_value = "continue")]
        on_error: ErrorPolicy,

        /// Delimiter of collapsed rows
        #[arg(long, default_value = "\t")]
        delimiter: char,
    },

    /// Show a file's columns, detected anomaly and first rows
    Inspect {
        /// Path to the data file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Number of rows to show
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Summarize a persisted audit document
    Audit {
        /// Path to the audit document
        #[arg(value_name = "AUDIT_FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Only show non-conforming records
        #[arg(long)]
        issues_only: bool,
    },
}
