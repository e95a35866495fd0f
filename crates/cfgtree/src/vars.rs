//! Variable table and `$NAME` expansion.
//!
//! Expansion is a single left-to-right pass: substituted text is never
//! scanned again, so definitions that refer to each other cannot loop.
//! `\\` and `\$` are unescaped here and nowhere else.

use std::{collections::HashMap, env};

use thiserror::Error;

/// Errors raised while expanding a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// `${` without a closing `}`.
    #[error("unterminated variable reference '${{{0}'")]
    UnterminatedBrace(String),
    /// `$(` without a matching `)`.
    #[error("unterminated command substitution '$({0}'")]
    UnterminatedCommand(String),
    /// The substituted command could not be run.
    #[error("{0}")]
    Command(String),
}

/// Strip an optional leading `$` from a variable name.
fn bare(name: &str) -> &str {
    name.strip_prefix('$').unwrap_or(name)
}

/// True for characters allowed in a bare `$NAME`.
fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Mapping of variable names (without `$`) to replacement text.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    /// Defined variables.
    map: HashMap<String, String>,
    /// Whether `$_NAME` falls back to the process environment.
    environment: bool,
}

impl Variables {
    /// Create an empty table.
    pub fn new(environment: bool) -> Self {
        Self {
            map: HashMap::new(),
            environment,
        }
    }

    /// Look up a defined variable. A leading `$` on `name` is ignored.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(bare(name)).map(String::as_str)
    }

    /// Define or replace a variable. A leading `$` on `name` is ignored.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.map.insert(bare(name).to_string(), value.into());
    }

    /// Number of defined variables.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True when nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over `(name, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Remove every definition.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Resolve `name` to its replacement, empty when undefined.
    ///
    /// Names starting with `_` fall back to the environment variable of the
    /// same name without the underscore.
    fn resolve(&self, name: &str) -> String {
        if let Some(v) = self.map.get(name) {
            return v.clone();
        }
        if self.environment
            && let Some(var) = name.strip_prefix('_')
            && !var.is_empty()
        {
            return env::var(var).unwrap_or_default();
        }
        String::new()
    }

    /// Expand variable references in `input`.
    ///
    /// `run` executes `$(...)` substitutions and returns their output.
    pub fn expand<F>(&self, input: &str, mut run: F) -> Result<String, ExpandError>
    where
        F: FnMut(&str) -> Result<String, String>,
    {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(idx) = rest.find(['$', '\\']) {
            out.push_str(&rest[..idx]);
            let tail = &rest[idx..];
            if let Some(after) = tail.strip_prefix("\\\\") {
                out.push('\\');
                rest = after;
            } else if let Some(after) = tail.strip_prefix("\\$") {
                out.push('$');
                rest = after;
            } else if let Some(after) = tail.strip_prefix('\\') {
                out.push('\\');
                rest = after;
            } else if let Some(after) = tail.strip_prefix("${") {
                let end = after
                    .find('}')
                    .ok_or_else(|| ExpandError::UnterminatedBrace(after.to_string()))?;
                out.push_str(&self.resolve(&after[..end]));
                rest = &after[end + 1..];
            } else if let Some(after) = tail.strip_prefix("$(") {
                let end = matching_paren(after)
                    .ok_or_else(|| ExpandError::UnterminatedCommand(after.to_string()))?;
                let output = run(&after[..end]).map_err(ExpandError::Command)?;
                out.push_str(output.trim_end_matches('\n'));
                rest = &after[end + 1..];
            } else {
                let after = &tail[1..];
                let len = after.find(|c| !is_name_char(c)).unwrap_or(after.len());
                if len == 0 {
                    out.push('$');
                } else {
                    out.push_str(&self.resolve(&after[..len]));
                }
                rest = &after[len..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Byte index of the `)` closing a `$(` whose body starts `s`.
fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}
