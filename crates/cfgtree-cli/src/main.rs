#![warn(missing_docs)]

//! Entry point for the `cfgtree` binary.

mod cli;
mod commands;
mod error;

use std::{io, process};

use clap::Parser;
use tracing::error;

use crate::{
    cli::{Cli, Commands},
    error::Result,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen command.
fn run() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    logging::init(&log);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Json(args) => commands::json(&args, &mut out),
        Commands::Print(args) => commands::print(&args, &mut out),
        Commands::Check(args) => commands::check(&args, &mut out),
    }
}
