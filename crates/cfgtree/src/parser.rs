//! Recursive-descent tree builder.
//!
//! The format being parsed:
//!
//! ```text
//! $var = "value"
//! INCLUDE = "file to include"
//! COMMAND = "command whose output is parsed"
//!
//! Define = "Template" {
//!   key = "value"
//! }
//!
//! section = "name" {
//!   key = "name" {
//!     value = "$var"
//!   }
//!   copy = "@Template"
//! }
//! ```
//!
//! Nesting is tracked with two explicit stacks rather than the call stack:
//! one of open sections and one of active sources. `INCLUDE` and `COMMAND`
//! push a source; its entries land wherever the directive stood.

use std::{
    collections::HashMap,
    mem,
    path::{Path, PathBuf},
};

use tracing::{debug, trace, warn};

use crate::{
    Diagnostic, Entry, Error,
    entry::fold_name,
    keys::expand_home,
    lexer::{self, Token, TokenKind},
    reload::{TimeFiles, absolute},
    source::{Source, SourceKind, run_command},
    vars::{ExpandError, Variables},
};

/// Source name stamped on the root entry.
const ROOT_SOURCE_NAME: &str = "<root>";

/// Tunables for a parser instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Shell used for command sources and `$(...)`, run as `<shell> -c <cmd>`.
    pub shell: String,
    /// Maximum number of sources open at once.
    pub max_depth: usize,
    /// Whether `$_NAME` falls back to the process environment.
    pub environment: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            shell: "/bin/sh".to_string(),
            max_depth: 32,
            environment: true,
        }
    }
}

/// Configuration parser holding the tree, variables and templates.
///
/// A parser can be fed several times; later parses add to (or with
/// `overwrite`, replace parts of) the tree built by earlier ones until
/// [`CfgParser::clear`] is called.
#[derive(Debug)]
pub struct CfgParser {
    /// Tunables.
    options: ParserOptions,
    /// Root of the parsed tree.
    root: Entry,
    /// `$NAME` table.
    vars: Variables,
    /// `Define` sections keyed by folded name.
    defines: HashMap<String, Entry>,
    /// Files read by the last parse.
    cfg_files: TimeFiles,
    /// Set when the last parse read command output.
    dynamic: bool,
    /// Messages collected by the last parse.
    diagnostics: Vec<Diagnostic>,
}

impl Default for CfgParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CfgParser {
    /// Parser with default options.
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// Parser with explicit options.
    pub fn with_options(options: ParserOptions) -> Self {
        Self {
            vars: Variables::new(options.environment),
            options,
            root: Self::new_root(),
            defines: HashMap::new(),
            cfg_files: TimeFiles::default(),
            dynamic: false,
            diagnostics: Vec::new(),
        }
    }

    /// A fresh, empty root entry.
    fn new_root() -> Entry {
        Entry::new(ROOT_SOURCE_NAME, 0, "ROOT", "")
    }

    /// Options this parser was built with.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Root of the parsed tree.
    pub fn entry_root(&self) -> &Entry {
        &self.root
    }

    /// Mutable root of the parsed tree.
    pub fn entry_root_mut(&mut self) -> &mut Entry {
        &mut self.root
    }

    /// True if the last parse read output of a command.
    pub fn is_dynamic_content(&self) -> bool {
        self.dynamic
    }

    /// Files read by the last parse, for staleness checks.
    pub fn cfg_files(&self) -> &TimeFiles {
        &self.cfg_files
    }

    /// Value of a variable; a leading `$` on `name` is optional.
    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    /// Define a variable before (or between) parses.
    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        self.vars.set(name, value);
    }

    /// The variable table.
    pub fn variables(&self) -> &Variables {
        &self.vars
    }

    /// Body of the `Define` section named `name` (case-insensitive).
    pub fn define(&self, name: &str) -> Option<&Entry> {
        self.defines.get(&fold_name(name))
    }

    /// Recorded `Define` sections as `(name, body)`, in no particular order.
    pub fn defines(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.defines.values().map(|body| (body.value(), body))
    }

    /// Warnings and errors collected by the last parse.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Discard the tree, variables, templates and reload state.
    pub fn clear(&mut self) {
        self.root = Self::new_root();
        self.vars.clear();
        self.defines.clear();
        self.cfg_files.clear();
        self.dynamic = false;
        self.diagnostics.clear();
    }

    /// Parse `src`: a path for files, a command line for commands, or the
    /// configuration text itself for strings.
    pub fn parse(&mut self, src: &str, kind: SourceKind, overwrite: bool) -> Result<(), Error> {
        self.begin();
        let source = Source::open(kind, src, &self.options.shell);
        match source {
            Ok(source) => self.run(source, overwrite),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Parse a configuration file.
    pub fn parse_file(&mut self, path: impl AsRef<Path>, overwrite: bool) -> Result<(), Error> {
        self.begin();
        match Source::file(path.as_ref()) {
            Ok(source) => self.run(source, overwrite),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Parse configuration text held in memory.
    pub fn parse_str(&mut self, text: &str, overwrite: bool) -> Result<(), Error> {
        self.parse(text, SourceKind::String, overwrite)
    }

    /// Parse an already opened source.
    pub fn parse_source(&mut self, source: Source, overwrite: bool) -> Result<(), Error> {
        self.begin();
        self.run(source, overwrite)
    }

    /// Reset per-parse state.
    fn begin(&mut self) {
        self.diagnostics.clear();
        self.cfg_files.clear();
        self.dynamic = false;
    }

    /// Record and log a fatal error.
    fn fail(&mut self, err: Error) -> Error {
        warn!(
            source = err.source_name(),
            line = err.line().unwrap_or(0),
            "{}",
            err.message()
        );
        self.diagnostics.push(err.to_diagnostic());
        err
    }

    /// Walk `source` and everything it includes into the tree.
    fn run(&mut self, source: Source, overwrite: bool) -> Result<(), Error> {
        let root = mem::take(&mut self.root);
        let mut walk = Walk {
            parser: self,
            root,
            sources: Vec::new(),
            sections: Vec::new(),
            overwrite,
        };
        let key = source_key(&source);
        let result = walk
            .push_source(source, key)
            .and_then(|()| walk.run());
        walk.finish();
        result.map_err(|err| self.fail(err))
    }
}

/// Identity of a source for cycle detection.
fn source_key(source: &Source) -> String {
    match source.kind() {
        SourceKind::File => match source.path() {
            Some(path) => file_key(path),
            None => format!("file:{}", source.name()),
        },
        SourceKind::Command => format!("command:{}", source.name()),
        SourceKind::String => format!("string:{}", source.name()),
    }
}

/// Cycle-detection key for a file path.
fn file_key(path: &Path) -> String {
    format!("file:{}", absolute(path).display())
}

/// Case-insensitive directive check.
fn is_directive(name: &str, directive: &str) -> bool {
    name.eq_ignore_ascii_case(directive)
}

/// Statement-level parse state.
enum State {
    /// Between statements.
    ExpectName,
    /// A name was read; `=`, `{` or (for `@Template`) anything else follows.
    ExpectEquals {
        /// The name read.
        name: String,
        /// Its line.
        line: usize,
    },
    /// `name =` was read; a value must follow.
    ExpectValue {
        /// The name read.
        name: String,
        /// Its line.
        line: usize,
    },
}

/// Where a section body goes once its `}` is read.
enum Target {
    /// A child entry of the enclosing section.
    Child {
        /// Entry name.
        name: String,
        /// Entry value.
        value: String,
    },
    /// The `Define` table, under the folded template name.
    Define(String),
}

/// An open `{` on the section stack.
struct SectionFrame {
    /// Entries collected so far.
    body: Entry,
    /// Destination of the body.
    target: Target,
    /// Line of the opening statement.
    line: usize,
    /// Source the section was opened in.
    source_name: String,
}

/// An active source on the source stack.
struct SourceFrame {
    /// The character stream.
    source: Source,
    /// Identity for cycle detection.
    key: String,
    /// Section stack depth when the source was pushed.
    sections: usize,
}

/// The body of the section currently being filled.
fn current_section<'a>(root: &'a mut Entry, sections: &'a mut [SectionFrame]) -> &'a mut Entry {
    match sections.last_mut() {
        Some(frame) => &mut frame.body,
        None => root,
    }
}

/// State of one top-level parse.
struct Walk<'p> {
    /// Parser owning variables, templates and reload state.
    parser: &'p mut CfgParser,
    /// Root being built; moved back into the parser by [`Walk::finish`].
    root: Entry,
    /// Active sources, innermost last.
    sources: Vec<SourceFrame>,
    /// Open sections, innermost last.
    sections: Vec<SectionFrame>,
    /// Replace same-named entries instead of appending.
    overwrite: bool,
}

impl Walk<'_> {
    /// Display name of the innermost source.
    fn source_name(&self) -> &str {
        self.sources
            .last()
            .map_or(ROOT_SOURCE_NAME, |f| f.source.name())
    }

    /// Build a structure error in the current source.
    fn structure(&self, line: usize, message: impl Into<String>) -> Error {
        Error::Structure {
            source_name: self.source_name().to_string(),
            line,
            message: message.into(),
        }
    }

    /// Build a reference error in the current source.
    fn reference(&self, line: usize, message: impl Into<String>) -> Error {
        Error::Reference {
            source_name: self.source_name().to_string(),
            line,
            message: message.into(),
        }
    }

    /// Record a non-fatal diagnostic.
    fn warn(&mut self, line: usize, message: String) {
        let diag = Diagnostic::warning(self.source_name(), line, message);
        warn!(source = %diag.source_name, line, "{}", diag.message);
        self.parser.diagnostics.push(diag);
    }

    /// Push a source after checking for cycles and depth.
    fn push_source(&mut self, source: Source, key: String) -> Result<(), Error> {
        let line = self.sources.last().map_or(0, |f| f.source.line());
        if self.sources.iter().any(|f| f.key == key) {
            return Err(self.structure(
                line,
                format!("recursive inclusion of '{}'", source.name()),
            ));
        }
        if self.sources.len() >= self.parser.options.max_depth {
            return Err(self.structure(
                line,
                format!(
                    "sources nested deeper than {} at '{}'",
                    self.parser.options.max_depth,
                    source.name()
                ),
            ));
        }
        if let Some(path) = source.path() {
            self.parser.cfg_files.add(path);
        }
        if source.is_dynamic() {
            self.parser.dynamic = true;
        }
        if let Some(failure) = source.command_failure() {
            self.warn(line, failure.to_string());
        }
        debug!(source = source.name(), depth = self.sources.len() + 1, "source opened");
        self.sources.push(SourceFrame {
            source,
            key,
            sections: self.sections.len(),
        });
        Ok(())
    }

    /// Main loop: read tokens until the outermost source is exhausted.
    fn run(&mut self) -> Result<(), Error> {
        let mut state = State::ExpectName;
        while let Some(frame) = self.sources.last_mut() {
            let token = lexer::next_token(&mut frame.source)?;
            state = self.step(state, token)?;
        }
        Ok(())
    }

    /// Advance the state machine by one token.
    fn step(&mut self, state: State, token: Token) -> Result<State, Error> {
        match state {
            State::ExpectName => self.expect_name(token),
            State::ExpectEquals { name, line } => match token.kind {
                TokenKind::Equals => Ok(State::ExpectValue { name, line }),
                TokenKind::Open => {
                    self.statement(&name, None, line, true)?;
                    Ok(State::ExpectName)
                }
                _ => match name.strip_prefix('@') {
                    Some(template) => {
                        self.splice_template(template, line)?;
                        self.expect_name(token)
                    }
                    None => Err(self.structure(line, format!("missing '=' after '{}'", name))),
                },
            },
            State::ExpectValue { name, line } => match token.kind {
                TokenKind::Word(raw) | TokenKind::Quoted(raw) => {
                    let value = self.expand(&raw, token.line)?;
                    let has_section = match self.sources.last_mut() {
                        Some(frame) => lexer::section_follows(&mut frame.source)?,
                        None => false,
                    };
                    self.statement(&name, Some(value), line, has_section)?;
                    Ok(State::ExpectName)
                }
                _ => Err(self.structure(token.line, format!("missing value for '{}'", name))),
            },
        }
    }

    /// Handle a token at statement start.
    fn expect_name(&mut self, token: Token) -> Result<State, Error> {
        match token.kind {
            TokenKind::Word(name) => Ok(State::ExpectEquals {
                name,
                line: token.line,
            }),
            TokenKind::Separator => Ok(State::ExpectName),
            TokenKind::Close => {
                self.close_section(token.line)?;
                Ok(State::ExpectName)
            }
            TokenKind::End => {
                self.end_source()?;
                Ok(State::ExpectName)
            }
            TokenKind::Quoted(_) | TokenKind::Equals | TokenKind::Open => {
                Err(self.structure(token.line, "expected a name"))
            }
        }
    }

    /// Expand variables in a raw value.
    fn expand(&mut self, raw: &str, line: usize) -> Result<String, Error> {
        let shell = self.parser.options.shell.clone();
        let mut ran = false;
        let mut failures = Vec::new();
        let result = self.parser.vars.expand(raw, |cmd| {
            ran = true;
            let output = run_command(&shell, cmd)?;
            failures.extend(output.failure);
            Ok(output.stdout)
        });
        if ran {
            self.parser.dynamic = true;
        }
        for failure in failures {
            self.warn(line, failure);
        }
        result.map_err(|err| match err {
            ExpandError::Command(message) => Error::Read {
                source_name: self.source_name().to_string(),
                message,
            },
            other => Error::Lex {
                source_name: self.source_name().to_string(),
                line,
                message: other.to_string(),
            },
        })
    }

    /// Finish a statement. `value` is `None` for `name {`.
    fn statement(
        &mut self,
        name: &str,
        value: Option<String>,
        line: usize,
        has_section: bool,
    ) -> Result<(), Error> {
        if let Some(var) = name.strip_prefix('$') {
            let (Some(value), false) = (value, has_section) else {
                return Err(self.structure(
                    line,
                    format!("variable '{}' cannot open a section", name),
                ));
            };
            if var.is_empty() {
                return Err(self.structure(line, "empty variable name"));
            }
            debug!(name = var, value = %value, "variable defined");
            self.parser.vars.set(var, value);
            return Ok(());
        }

        let value = value.unwrap_or_default();
        let include = is_directive(name, "INCLUDE");
        if include || is_directive(name, "COMMAND") {
            if has_section {
                return Err(self.structure(line, format!("{} cannot open a section", name)));
            }
            return if include {
                self.include(&value, line)
            } else {
                self.command(&value, line)
            };
        }

        if has_section && is_directive(name, "Define") {
            if value.is_empty() {
                return Err(self.structure(line, "Define requires a template name"));
            }
            let body = Entry::new(self.source_name(), line, name, &value);
            self.open_section(body, Target::Define(fold_name(&value)), line);
            return Ok(());
        }

        if let Some(template) = value.strip_prefix('@') {
            let mut body = Entry::new(self.source_name(), line, name, "");
            match self.parser.defines.get(&fold_name(template)) {
                Some(define) => body.copy_tree_into(define, false),
                None => {
                    return Err(self.reference(line, format!("undefined template '{}'", template)));
                }
            }
            debug!(name, template, "template expanded");
            if has_section {
                let target = Target::Child {
                    name: name.to_string(),
                    value: String::new(),
                };
                self.open_section(body, target, line);
            } else {
                let entry = Entry::with_section(self.source_name(), line, name, "", body);
                current_section(&mut self.root, &mut self.sections).add_entry(entry, self.overwrite);
            }
            return Ok(());
        }

        if has_section {
            let body = Entry::new(self.source_name(), line, name, &value);
            let target = Target::Child {
                name: name.to_string(),
                value,
            };
            self.open_section(body, target, line);
        } else {
            trace!(name, value = %value, line, "entry");
            let entry = Entry::new(self.source_name(), line, name, &value);
            current_section(&mut self.root, &mut self.sections).add_entry(entry, self.overwrite);
        }
        Ok(())
    }

    /// Splice a copy of a template's children into the current section.
    fn splice_template(&mut self, template: &str, line: usize) -> Result<(), Error> {
        let Some(define) = self.parser.defines.get(&fold_name(template)) else {
            return Err(self.reference(line, format!("undefined template '{}'", template)));
        };
        current_section(&mut self.root, &mut self.sections).copy_tree_into(define, self.overwrite);
        debug!(template, "template spliced");
        Ok(())
    }

    /// Resolve an `INCLUDE` path against the including file.
    fn resolve_include(&self, value: &str) -> PathBuf {
        let path = PathBuf::from(expand_home(value));
        if path.is_absolute() {
            return path;
        }
        match self
            .sources
            .last()
            .and_then(|f| f.source.path())
            .and_then(Path::parent)
        {
            Some(dir) => dir.join(path),
            None => path,
        }
    }

    /// Handle `INCLUDE = "path"`.
    fn include(&mut self, value: &str, line: usize) -> Result<(), Error> {
        if value.is_empty() {
            return Err(self.reference(line, "empty INCLUDE path"));
        }
        let path = self.resolve_include(value);
        let key = file_key(&path);
        if self.sources.iter().any(|f| f.key == key) {
            return Err(self.structure(
                line,
                format!("recursive inclusion of '{}'", path.display()),
            ));
        }
        let source = Source::file(&path).map_err(|err| self.reference(line, err.message()))?;
        self.push_source(source, key)
    }

    /// Handle `COMMAND = "command"`.
    fn command(&mut self, value: &str, line: usize) -> Result<(), Error> {
        if value.is_empty() {
            return Err(self.reference(line, "empty COMMAND"));
        }
        let source = Source::command(value, &self.parser.options.shell)?;
        let key = source_key(&source);
        self.push_source(source, key)
    }

    /// Push a section frame.
    fn open_section(&mut self, body: Entry, target: Target, line: usize) {
        trace!(name = body.name(), line, "section opened");
        self.sections.push(SectionFrame {
            body,
            target,
            line,
            source_name: self.source_name().to_string(),
        });
    }

    /// Handle `}`.
    fn close_section(&mut self, line: usize) -> Result<(), Error> {
        let base = self.sources.last().map_or(0, |f| f.sections);
        if self.sections.len() <= base {
            return Err(self.structure(line, "unmatched '}'"));
        }
        if let Some(frame) = self.sections.pop() {
            self.attach(frame);
        }
        Ok(())
    }

    /// Move a closed section body to its destination.
    fn attach(&mut self, frame: SectionFrame) {
        match frame.target {
            Target::Define(name) => {
                debug!(template = %name, "template defined");
                self.parser.defines.insert(name, frame.body);
            }
            Target::Child { name, value } => {
                let entry =
                    Entry::with_section(&frame.source_name, frame.line, &name, &value, frame.body);
                current_section(&mut self.root, &mut self.sections).add_entry(entry, self.overwrite);
            }
        }
    }

    /// Handle the end of the innermost source.
    fn end_source(&mut self) -> Result<(), Error> {
        let base = self.sources.last().map_or(0, |f| f.sections);
        if let Some(open) = self.sections.get(base..).and_then(<[SectionFrame]>::last) {
            return Err(Error::Structure {
                source_name: open.source_name.clone(),
                line: open.line,
                message: format!("unmatched '{{' for '{}'", open.body.name()),
            });
        }
        if let Some(frame) = self.sources.pop() {
            debug!(source = frame.source.name(), "source finished");
        }
        Ok(())
    }

    /// Close any sections left open by a failed parse and hand the tree back.
    fn finish(mut self) {
        while let Some(frame) = self.sections.pop() {
            self.attach(frame);
        }
        self.sources.clear();
        self.parser.root = self.root;
    }
}
