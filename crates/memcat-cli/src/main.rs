//! # memcat CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memcat_cli::apply::{run_apply, ApplyArgs};
use memcat_cli::preview::{run_preview, PreviewArgs};
use memcat_cli::validate::{run_validate, ValidateArgs};

/// Membership categorization engine CLI.
///
/// Validates rule catalogues and runs them against member exports without a
/// running server.
#[derive(Parser, Debug)]
#[command(name = "memcat", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a rule catalogue and list its rules in execution order.
    Validate(ValidateArgs),

    /// Show which members each rule would move, without changing anything.
    Preview(PreviewArgs),

    /// Run rules against a members file and write the results.
    Apply(ApplyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Preview(args) => run_preview(&args),
        Commands::Apply(args) => run_apply(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}
