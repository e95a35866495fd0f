//! Parser for nested key/section configuration files.
//!
//! Files consist of `name = "value"` entries and `name = "value" { ... }`
//! sections, with `$variables`, `INCLUDE` and `COMMAND` directives and
//! `Define` templates. Parsing yields a tree of [`Entry`] values rooted at
//! [`CfgParser::entry_root`].
//!
//! ```no_run
//! use cfgtree::CfgParser;
//!
//! let mut parser = CfgParser::new();
//! parser.parse_file("/etc/app/config", false)?;
//! if let Some(screen) = parser.entry_root().find_section("Screen", None) {
//!     for entry in screen {
//!         println!("{} = {}", entry.name(), entry.value());
//!     }
//! }
//! # Ok::<(), cfgtree::Error>(())
//! ```

pub mod dump;
mod entry;
mod error;
pub mod keys;
pub mod lexer;
mod parser;
mod reload;
mod source;
mod vars;

#[cfg(test)]
mod test_include;
#[cfg(test)]
mod test_parse;
#[cfg(test)]
mod test_vars;

pub use dump::to_json;
pub use entry::{Entry, fold_name};
pub use error::{Diagnostic, Error, Level};
pub use keys::{CfgKey, KeyBool, KeyError, KeyNumeric, KeyPath, KeyReport, KeyString};
pub use parser::{CfgParser, ParserOptions};
pub use reload::TimeFiles;
pub use source::{Source, SourceKind};
pub use vars::{ExpandError, Variables};
