//! Error and diagnostic types produced while reading configuration sources.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Errors that abort a parse.
pub enum Error {
    #[error("{message}")]
    /// A file could not be opened or read, or a command could not be spawned.
    Read {
        /// Display name of the source that failed.
        source_name: String,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// Unterminated quoted string, block comment, or substitution.
    Lex {
        /// Display name of the source being read.
        source_name: String,
        /// 1-based line where the offending construct started.
        line: usize,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// Unmatched braces, missing `=`, include cycles and similar shape errors.
    Structure {
        /// Display name of the source being read.
        source_name: String,
        /// 1-based line of the offending token.
        line: usize,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// An `INCLUDE` that cannot be opened or a template that was never defined.
    Reference {
        /// Display name of the source holding the reference.
        source_name: String,
        /// 1-based line of the reference.
        line: usize,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Render a human-friendly message including the source location.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read {
                source_name,
                message,
            } => format!("Read error at {}\n{}", source_name, message),
            Self::Lex {
                source_name,
                line,
                message,
            } => format!("Lex error at {}:{}\n{}", source_name, line, message),
            Self::Structure {
                source_name,
                line,
                message,
            } => format!("Structure error at {}:{}\n{}", source_name, line, message),
            Self::Reference {
                source_name,
                line,
                message,
            } => format!("Reference error at {}:{}\n{}", source_name, line, message),
        }
    }

    /// Display name of the source the error was raised in.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Read { source_name, .. }
            | Self::Lex { source_name, .. }
            | Self::Structure { source_name, .. }
            | Self::Reference { source_name, .. } => source_name,
        }
    }

    /// Line the error was raised at, when the source had been opened.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Read { .. } => None,
            Self::Lex { line, .. } | Self::Structure { line, .. } | Self::Reference { line, .. } => {
                Some(*line)
            }
        }
    }

    /// The bare message, without location.
    pub fn message(&self) -> &str {
        match self {
            Self::Read { message, .. }
            | Self::Lex { message, .. }
            | Self::Structure { message, .. }
            | Self::Reference { message, .. } => message,
        }
    }

    /// Convert into an error-level diagnostic record.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            level: Level::Error,
            source_name: self.source_name().to_string(),
            line: self.line().unwrap_or(0),
            message: self.message().to_string(),
        }
    }
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Recorded, but the parse continued.
    Warning,
    /// The parse was aborted.
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A located message collected while parsing.
///
/// Line `0` means the message is not tied to a position, e.g. a source that
/// could not be opened at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity.
    pub level: Level,
    /// Display name of the source.
    pub source_name: String,
    /// 1-based line, or 0 when unknown.
    pub line: usize,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Build a warning-level diagnostic.
    pub fn warning(source_name: &str, line: usize, message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            source_name: source_name.to_string(),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(
                f,
                "{}:{}: {}: {}",
                self.source_name, self.line, self.level, self.message
            )
        } else {
            write!(f, "{}: {}: {}", self.source_name, self.level, self.message)
        }
    }
}
