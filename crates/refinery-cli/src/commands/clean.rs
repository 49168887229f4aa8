//! Clean command - conform a directory of files and write the audit trail.

use std::path::PathBuf;

use colored::Colorize;
use refinery::{BatchConfig, BatchDriver, ErrorPolicy, FileOutcome, FileReport, SchemaAnomaly};

pub struct CleanArgs {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub filter: Option<String>,
    pub audit: Option<PathBuf>,
    pub layer: String,
    pub on_error: ErrorPolicy,
    pub delimiter: char,
}

pub fn run(args: CleanArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !args.source.is_dir() {
        return Err(format!("Source directory not found: {}", args.source.display()).into());
    }

    let mut config = BatchConfig::default()
        .with_layer(args.layer)
        .with_error_policy(args.on_error)
        .with_collapsed_delimiter(args.delimiter);
    if let Some(filter) = args.filter {
        config = config.with_filter(filter);
    }
    if let Some(audit) = args.audit {
        config = config.with_audit_path(audit);
    }

    println!(
        "{} {} {} {}",
        "Cleaning".cyan().bold(),
        args.source.display().to_string().white(),
        "→".dimmed(),
        args.dest.display().to_string().white()
    );

    let driver = BatchDriver::new(config);
    let report = driver.run_with_progress(&args.source, &args.dest, |file| {
        print_progress(file, verbose)
    })?;

    println!();
    println!(
        "{} {} written, {} skipped (already exist), {} failed",
        "Done:".green().bold(),
        report.written().to_string().white().bold(),
        report.skipped().to_string().yellow(),
        report.failed().to_string().red()
    );

    if !report.drifted.is_empty() {
        println!(
            "  {} file(s) had a different column set than the first file",
            report.drifted.len().to_string().yellow()
        );
        if verbose {
            for path in &report.drifted {
                println!("    {} {}", "•".dimmed(), path.display());
            }
        }
    }

    println!(
        "  {} audit record(s) saved to {}",
        report.trail.len().to_string().white(),
        report.audit_path.display().to_string().cyan()
    );

    Ok(())
}

fn print_progress(file: &FileReport, verbose: bool) {
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let repair = match &file.anomaly {
        Some(SchemaAnomaly::MissingHeader { .. }) => " [header restored]".yellow().to_string(),
        Some(SchemaAnomaly::DelimiterCollapsed { .. }) => " [delimiter split]".yellow().to_string(),
        _ => String::new(),
    };

    match &file.outcome {
        FileOutcome::Written => println!(
            "  {} {}{} ({} rows)",
            "✓".green(),
            name,
            repair,
            file.rows
        ),
        FileOutcome::SkippedWrite => println!(
            "  {} {}{} {}",
            "-".yellow(),
            name,
            repair,
            "output exists, not written".dimmed()
        ),
        FileOutcome::Failed { reason } => {
            println!("  {} {} {}", "✗".red(), name, "failed".red());
            if verbose {
                println!("      {}", reason.dimmed());
            }
        }
    }
}
