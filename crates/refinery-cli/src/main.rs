//! Refinery CLI - schema conformance for hand-exported tabular files.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Clean {
            source,
            dest,
            filter,
            audit,
            layer,
            on_error,
            delimiter,
        } => commands::clean::run(
            commands::clean::CleanArgs {
                source,
                dest,
                filter,
                audit,
                layer,
                on_error,
                delimiter,
            },
            cli.verbose,
        ),

        Commands::Inspect { file, rows, json } => commands::inspect::run(file, rows, json, cli.verbose),

        Commands::Audit {
            file,
            json,
            issues_only,
        } => commands::audit::run(file, json, issues_only, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
