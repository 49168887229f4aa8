//! Inspect command - show how a single file looks before conformance.

use std::path::PathBuf;

use colored::Colorize;
use refinery::{detect, CanonicalSchema, Parser, SchemaAnomaly};

pub fn run(
    file: PathBuf,
    rows: usize,
    json_output: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let (table, metadata) = Parser::new().parse_file(&file)?;
    let schema = CanonicalSchema::intraday();
    let anomaly = detect(&table, &schema);

    if json_output {
        let columns: Vec<_> = table
            .columns()
            .map(|(name, data)| {
                serde_json::json!({
                    "name": name,
                    "type": data.column_type().label(),
                    "expected": schema.expected_type(name).map(|t| t.label()),
                })
            })
            .collect();
        let preview: Vec<Vec<String>> = (0..rows.min(table.row_count()))
            .map(|row| table.row_text(row))
            .collect();
        let summary = serde_json::json!({
            "source": metadata,
            "columns": columns,
            "anomaly": anomaly,
            "preview": preview,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {} ({}, {} rows, {} columns)",
        "Inspecting".cyan().bold(),
        metadata.file.white(),
        metadata.format.label(),
        metadata.row_count,
        metadata.column_count
    );
    if verbose {
        println!("  {} {}", "sha256:".dimmed(), metadata.hash.dimmed());
        println!("  {} {} bytes", "size:".dimmed(), metadata.size_bytes);
    }
    println!();

    println!("{}", "Columns:".white().bold());
    for (name, data) in table.columns() {
        let observed = data.column_type();
        let expectation = match schema.expected_type(name) {
            Some(expected) if expected == observed => "✓".green().to_string(),
            Some(expected) => format!("{} {}", "→".yellow(), expected.to_string().yellow()),
            None => "not canonical".dimmed().to_string(),
        };
        println!("  {:<24} {:<8} {}", name, observed.to_string(), expectation);
    }
    println!();

    match &anomaly {
        SchemaAnomaly::None => println!("{} {}", "Structure:".white().bold(), "conforming".green()),
        SchemaAnomaly::MissingHeader { missing } => {
            println!(
                "{} {} ({} canonical column(s) missing)",
                "Structure:".white().bold(),
                "missing header".yellow(),
                missing.len()
            );
            println!("  {} {}", "missing:".dimmed(), missing.join(", "));
        }
        SchemaAnomaly::DelimiterCollapsed { .. } => println!(
            "{} {}",
            "Structure:".white().bold(),
            "delimiter collapsed into one column".yellow()
        ),
    }

    let shown = rows.min(table.row_count());
    if shown > 0 {
        println!();
        println!("{} (first {})", "Rows:".white().bold(), shown);
        println!("  {}", table.column_names().join(" | ").dimmed());
        for row in 0..shown {
            println!("  {}", table.row_text(row).join(" | "));
        }
    }

    Ok(())
}
