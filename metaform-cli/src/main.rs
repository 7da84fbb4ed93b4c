//! Metaform CLI - evaluate form values against declarative form metadata.
//!
//! Commands:
//! - `metaform check --form <yaml> [--values <file>]`: Per-field status table
//! - `metaform submit --form <yaml> [--values <file>]`: Submitted payload or error map as JSON
//! - `metaform fields --form <yaml>`: List declared fields
//!
//! Exit codes:
//! - 0: Success
//! - 1: Validation failed, or an error occurred

use clap::Parser;
use tracing_subscriber::EnvFilter;

use metaform_cli::{check, fields};
use metaform_cli::{Cli, Commands};

/// Map a command result to an exit code, reporting errors on stderr.
fn handle_result(result: anyhow::Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level
    let filter = if cli.debug {
        EnvFilter::new("metaform=debug,metaform_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Check { form, values } => {
            handle_result(check::run_check(&form, values.as_deref()).await)
        }
        Commands::Submit { form, values } => {
            handle_result(check::run_submit(&form, values.as_deref()).await)
        }
        Commands::Fields { form } => handle_result(fields::run_fields(&form).await),
    };

    std::process::exit(exit_code);
}
