//! Command-line interface definitions for the `cfgtree` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `cfgtree` binary.
#[derive(Parser, Debug)]
#[command(
    name = "cfgtree",
    about = "Parse, dump and check configuration trees",
    version
)]
pub struct Cli {
    /// Logging controls shared across workspace binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to do with the parsed configuration.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump the parsed tree as pretty-printed JSON.
    Json(InputArgs),
    /// Print the parsed tree as normalized configuration text.
    Print(InputArgs),
    /// Parse and report tracked files, dynamic content and diagnostics.
    Check(CheckArgs),
}

/// Input selection shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Configuration file to parse.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Define a variable before parsing, e.g. `-e THEME=dark`. Repeatable.
    #[arg(
        short = 'e',
        long = "env",
        value_name = "NAME=VALUE",
        value_parser = parse_var
    )]
    pub vars: Vec<(String, String)>,
}

/// Arguments for `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// File and variables to parse.
    #[command(flatten)]
    pub input: InputArgs,

    /// Emit the report as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Parse a `NAME=VALUE` pair; the value may itself contain `=`.
pub fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}
