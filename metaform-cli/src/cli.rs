//! CLI definition for the metaform command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Metaform - evaluate form values against declarative form metadata.
///
/// Loads a YAML form definition, applies values as user edits in file order,
/// waits for option providers to settle, and submits.
#[derive(Parser, Debug)]
#[command(name = "metaform")]
#[command(version)]
#[command(about = "Evaluate form values against declarative form metadata")]
#[command(
    long_about = "Metaform loads a YAML form definition and drives a form session with it: \
    visibility, validation and option resolution, then submit.\n\n\
    Engine settings are read from metaform.{toml,yaml,json} in the current directory.\n\n\
    Environment variables:\n  \
    METAFORM_SCOPED_OPTION_REFRESH  Re-run providers only when their declared inputs change\n  \
    METAFORM_PROVIDER_TIMEOUT_MS    Time limit for each option provider call\n  \
    METAFORM_VALIDATE_ON_CHANGE     Validate each field as its value is applied"
)]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate values and print per-field visibility, status and errors
    Check {
        /// Form metadata (YAML)
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
        /// Values to apply (YAML or JSON mapping of field id to value)
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,
    },

    /// Submit values and print the payload, or the errors, as JSON
    Submit {
        /// Form metadata (YAML)
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
        /// Values to apply (YAML or JSON mapping of field id to value)
        #[arg(long, value_name = "FILE")]
        values: Option<PathBuf>,
    },

    /// List the fields a form declares
    Fields {
        /// Form metadata (YAML)
        #[arg(long, value_name = "FILE")]
        form: PathBuf,
    },
}
