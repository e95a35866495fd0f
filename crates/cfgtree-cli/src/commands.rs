//! Implementations of the `json`, `print` and `check` commands.

use std::{io::Write, result};

use cfgtree::{CfgParser, to_json};
use serde_json::json;
use tracing::{debug, info};

use crate::{
    cli::{CheckArgs, InputArgs},
    error::Result,
};

/// Parse the input file with the requested variables preset.
fn load(args: &InputArgs) -> (CfgParser, result::Result<(), cfgtree::Error>) {
    let mut parser = CfgParser::new();
    for (name, value) in &args.vars {
        debug!(name, value, "preset variable");
        parser.set_var(name, value.as_str());
    }
    let result = parser.parse_file(&args.file, false);
    (parser, result)
}

/// Write the tree as pretty JSON.
pub fn json(args: &InputArgs, out: &mut impl Write) -> Result<()> {
    let (parser, result) = load(args);
    result?;
    serde_json::to_writer_pretty(&mut *out, &to_json(parser.entry_root()))?;
    writeln!(out)?;
    Ok(())
}

/// Write the tree as configuration text.
pub fn print(args: &InputArgs, out: &mut impl Write) -> Result<()> {
    let (parser, result) = load(args);
    result?;
    write!(out, "{}", parser.entry_root())?;
    Ok(())
}

/// Write a summary of the parse: files, dynamic flag and diagnostics.
///
/// The report is written in full before a parse error is returned.
pub fn check(args: &CheckArgs, out: &mut impl Write) -> Result<()> {
    let (parser, result) = load(&args.input);
    if args.json {
        let report = json!({
            "files": parser.cfg_files().files(),
            "dynamic": parser.is_dynamic_content(),
            "entries": parser.entry_root().len(),
            "diagnostics": parser.diagnostics(),
            "ok": result.is_ok(),
        });
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        result?;
        return Ok(());
    }
    for file in parser.cfg_files().files() {
        writeln!(out, "file: {}", file.display())?;
    }
    writeln!(out, "dynamic: {}", parser.is_dynamic_content())?;
    writeln!(out, "entries: {}", parser.entry_root().len())?;
    for diag in parser.diagnostics() {
        writeln!(out, "{}", diag)?;
    }
    result?;
    info!(file = %args.input.file.display(), "configuration ok");
    writeln!(out, "ok")?;
    Ok(())
}
