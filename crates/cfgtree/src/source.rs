//! Character sources the parser reads from.
//!
//! A [`Source`] is fully materialized when it is opened: files are read into
//! memory and commands are run to completion before any character is handed
//! out. This keeps ordering deterministic and lets the lexer step back one
//! character at a time.

use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use tracing::debug;

use crate::Error;

/// Where a source's characters come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A file on disk.
    File,
    /// Text held in memory.
    String,
    /// Standard output of a shell command.
    Command,
}

/// Captured result of running a command through the shell.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Everything the command wrote to stdout, lossily decoded.
    pub stdout: String,
    /// Description of a non-successful exit, if any.
    pub failure: Option<String>,
}

/// Run `command` as `<shell> -c <command>` and wait for it to exit.
pub fn run_command(shell: &str, command: &str) -> Result<CommandOutput, String> {
    debug!(shell, command, "running command");
    let output = Command::new(shell)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| format!("cannot run command '{}': {}", command, e))?;
    let failure = (!output.status.success()).then(|| match output.status.code() {
        Some(code) => format!("command '{}' exited with status {}", command, code),
        None => format!("command '{}' was terminated by a signal", command),
    });
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        failure,
    })
}

/// A stream of characters with line tracking.
#[derive(Debug, Clone)]
pub struct Source {
    /// Display name, stamped onto every entry parsed from this source.
    name: String,
    /// Origin of the data.
    kind: SourceKind,
    /// Resolved path for file sources.
    path: Option<PathBuf>,
    /// Materialized content.
    chars: Vec<char>,
    /// Index of the next character to hand out.
    pos: usize,
    /// 1-based line of the next character.
    line: usize,
    /// Set when a command source exited unsuccessfully.
    failure: Option<String>,
}

impl Source {
    /// Open a source of the given kind. `name` is a path for files, the
    /// command line for commands and the text itself for strings.
    pub fn open(kind: SourceKind, name: &str, shell: &str) -> Result<Self, Error> {
        match kind {
            SourceKind::File => Self::file(Path::new(name)),
            SourceKind::Command => Self::command(name, shell),
            SourceKind::String => Ok(Self::from_string("<string>", name)),
        }
    }

    /// Read a file into a new source named after its path.
    pub fn file(path: &Path) -> Result<Self, Error> {
        let name = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| Error::Read {
            source_name: name.clone(),
            message: format!("cannot open {}: {}", name, e),
        })?;
        let mut source = Self::with_data(&name, SourceKind::File, &String::from_utf8_lossy(&bytes));
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Run `command` through `shell` and use its output as the source.
    pub fn command(command: &str, shell: &str) -> Result<Self, Error> {
        let output = run_command(shell, command).map_err(|message| Error::Read {
            source_name: command.to_string(),
            message,
        })?;
        let mut source = Self::with_data(command, SourceKind::Command, &output.stdout);
        source.failure = output.failure;
        Ok(source)
    }

    /// Build an in-memory source with an explicit display name.
    pub fn from_string(name: &str, data: &str) -> Self {
        Self::with_data(name, SourceKind::String, data)
    }

    /// Shared constructor.
    fn with_data(name: &str, kind: SourceKind, data: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            path: None,
            chars: data.chars().collect(),
            pos: 0,
            line: 1,
            failure: None,
        }
    }

    /// Display name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Origin of the source.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Path the source was read from, for file sources.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current 1-based line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// True when the content depends on something other than file contents.
    pub fn is_dynamic(&self) -> bool {
        self.kind == SourceKind::Command
    }

    /// Why a command source exited unsuccessfully, if it did.
    pub fn command_failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Next character, or `None` once the source is exhausted.
    pub fn next_char(&mut self) -> Option<char> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// Look at the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Step back over the last character handed out.
    pub fn unget(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.pos -= 1;
        if self.chars[self.pos] == '\n' {
            self.line -= 1;
        }
    }
}
