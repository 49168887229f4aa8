//! Audit command - summarize a persisted audit document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use colored::Colorize;
use refinery::{Action, AuditTrail, ConformanceRecord, Status};

pub fn run(
    file: PathBuf,
    json_output: bool,
    issues_only: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!(
            "Audit file not found: {}\nRun 'refinery clean' first.",
            file.display()
        )
        .into());
    }

    let trail = AuditTrail::load(&file)?;

    let mut by_issue: BTreeMap<&str, usize> = BTreeMap::new();
    let mut files: Vec<&str> = Vec::new();
    for record in trail.records() {
        *by_issue.entry(record.issue().code()).or_default() += 1;
        if !files.contains(&record.file()) {
            files.push(record.file());
        }
    }

    let non_conforming: Vec<&ConformanceRecord> = trail
        .records()
        .iter()
        .filter(|r| r.status() == Status::NonConforming)
        .collect();

    if json_output {
        let summary = serde_json::json!({
            "audit_file": file.display().to_string(),
            "files": files.len(),
            "records": trail.len(),
            "status": {
                "conforming": trail.len() - non_conforming.len(),
                "non_conforming": non_conforming.len(),
            },
            "actions": {
                "processed": trail.count_action(Action::Processed),
                "adjusted": trail.count_action(Action::Adjusted),
                "skipped": trail.count_action(Action::Skipped),
            },
            "issues": by_issue,
            "non_conforming": non_conforming,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Audit summary for".cyan().bold(),
        file.display().to_string().white()
    );
    println!();

    if !issues_only {
        println!(
            "Files: {}  Records: {}",
            files.len().to_string().white().bold(),
            trail.len().to_string().white().bold()
        );
        println!(
            "  {} processed, {} adjusted, {} skipped",
            trail.count_action(Action::Processed).to_string().green(),
            trail.count_action(Action::Adjusted).to_string().yellow(),
            trail.count_action(Action::Skipped).to_string().red()
        );
        println!();

        println!("{}", "Issues:".white().bold());
        for (issue, count) in &by_issue {
            println!("  {:<26} {}", issue, count);
        }
        println!();
    }

    if non_conforming.is_empty() {
        println!("{}", "Every record is conforming.".green());
        return Ok(());
    }

    println!(
        "{} ({})",
        "Non-conforming:".red().bold(),
        non_conforming.len()
    );
    for record in non_conforming {
        println!(
            "  {} {} [{}] {}",
            "✗".red(),
            record.file(),
            record.sub_process(),
            record.issue().to_string().yellow()
        );
        if verbose {
            println!("      {}", record.notes().dimmed());
        }
    }

    if verbose && !issues_only {
        println!();
        println!("{}", "All records:".white().bold());
        for file in &files {
            println!("  {}", file.white());
            for record in trail.for_file(file) {
                println!(
                    "    {:<14} {:<26} {:?}",
                    record.sub_process(),
                    record.issue().code(),
                    record.action()
                );
            }
        }
    }

    Ok(())
}
