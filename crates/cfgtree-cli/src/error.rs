//! Error handling for the cfgtree binary.

use std::{io, result};

use thiserror::Error;

/// Convenient result type for CLI operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration failed to parse.
    #[error("{}", .0.pretty())]
    Parse(#[from] cfgtree::Error),
    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The tree could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
