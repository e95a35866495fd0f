//! The parsed configuration tree.

use std::{fmt, slice};

use tracing::warn;

use crate::{
    Diagnostic,
    keys::{CfgKey, KeyReport},
};

/// Fold a name to the form used for every comparison.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// A node in the configuration tree.
///
/// An entry carries a name and value and may own a section: a nested entry
/// whose children are the body of `name = "value" { ... }`. The root of a
/// parse is itself an entry whose children are the top-level statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Name as written.
    name: String,
    /// Folded name used for comparisons.
    key: String,
    /// Variable-expanded value; empty for bare sections.
    value: String,
    /// 1-based line the entry was declared on.
    line: usize,
    /// Display name of the source the entry came from.
    source_name: String,
    /// Owned sub-section.
    section: Option<Box<Entry>>,
    /// Children in declaration order.
    entries: Vec<Entry>,
}

impl Entry {
    /// Create an entry without a section.
    pub fn new(source_name: &str, line: usize, name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            key: fold_name(name),
            value: value.to_string(),
            line,
            source_name: source_name.to_string(),
            section: None,
            entries: Vec::new(),
        }
    }

    /// Create an entry owning `section`.
    pub fn with_section(
        source_name: &str,
        line: usize,
        name: &str,
        value: &str,
        section: Self,
    ) -> Self {
        let mut entry = Self::new(source_name, line, name, value);
        entry.section = Some(Box::new(section));
        entry
    }

    /// Name as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value after variable expansion.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Line the entry was declared on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Source the entry was declared in.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.key == fold_name(name)
    }

    /// The owned sub-section, if any.
    pub fn section(&self) -> Option<&Self> {
        self.section.as_deref()
    }

    /// Mutable access to the owned sub-section.
    pub fn section_mut(&mut self) -> Option<&mut Self> {
        self.section.as_deref_mut()
    }

    /// Attach `section`. With `overwrite`, an existing section is merged into
    /// instead of replaced.
    pub fn set_section(&mut self, section: Self, overwrite: bool) -> &mut Self {
        match &mut self.section {
            Some(existing) if overwrite => existing.copy_tree_from(section, true),
            slot => *slot = Some(Box::new(section)),
        }
        self.section.get_or_insert_with(Box::default)
    }

    /// Children in declaration order.
    pub fn entries(&self) -> &[Self] {
        &self.entries
    }

    /// Iterate over children.
    pub fn iter(&self) -> slice::Iter<'_, Self> {
        self.entries.iter()
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no children.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the first child matching the lookup rules of [`Self::find_entry`].
    fn position(&self, key: &str, include_sections: bool, value: Option<&str>) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.key == key
                && (include_sections || e.section.is_none())
                && value.is_none_or(|v| e.value == v)
        })
    }

    /// Append `entry`, or with `overwrite` replace a child of the same name.
    ///
    /// A plain entry only replaces a plain child; an entry carrying a section
    /// may replace any child. Sections are merged recursively.
    pub fn add_entry(&mut self, entry: Self, overwrite: bool) -> &mut Self {
        let existing = if overwrite {
            self.position(&entry.key, entry.section.is_some(), None)
        } else {
            None
        };
        match existing {
            Some(idx) => {
                let target = &mut self.entries[idx];
                target.replace_with(entry);
                target
            }
            None => {
                let idx = self.entries.len();
                self.entries.push(entry);
                &mut self.entries[idx]
            }
        }
    }

    /// Take over value, location and section of `other`.
    fn replace_with(&mut self, other: Self) {
        self.value = other.value;
        self.line = other.line;
        self.source_name = other.source_name;
        if let Some(section) = other.section {
            self.set_section(*section, true);
        }
    }

    /// Find the first child named `name` (case-insensitive).
    ///
    /// Children owning a section are skipped unless `include_sections` is
    /// set. When `value` is given the child's value must match it exactly.
    pub fn find_entry(
        &self,
        name: &str,
        include_sections: bool,
        value: Option<&str>,
    ) -> Option<&Self> {
        self.position(&fold_name(name), include_sections, value)
            .map(|idx| &self.entries[idx])
    }

    /// Mutable variant of [`Self::find_entry`].
    pub fn find_entry_mut(
        &mut self,
        name: &str,
        include_sections: bool,
        value: Option<&str>,
    ) -> Option<&mut Self> {
        self.position(&fold_name(name), include_sections, value)
            .map(|idx| &mut self.entries[idx])
    }

    /// Find the section body of the first section-owning child named `name`.
    pub fn find_section(&self, name: &str, value: Option<&str>) -> Option<&Self> {
        let key = fold_name(name);
        self.entries
            .iter()
            .find(|e| e.section.is_some() && e.key == key && value.is_none_or(|v| e.value == v))
            .and_then(Self::section)
    }

    /// Mutable variant of [`Self::find_section`].
    pub fn find_section_mut(&mut self, name: &str, value: Option<&str>) -> Option<&mut Self> {
        let key = fold_name(name);
        self.entries
            .iter_mut()
            .find(|e| e.section.is_some() && e.key == key && value.is_none_or(|v| e.value == v))
            .and_then(Self::section_mut)
    }

    /// Deep-copy the children of `from` into this entry.
    pub fn copy_tree_into(&mut self, from: &Self, overwrite: bool) {
        for child in &from.entries {
            self.add_entry(child.clone(), overwrite);
        }
    }

    /// Move the children of `from` into this entry.
    fn copy_tree_from(&mut self, from: Self, overwrite: bool) {
        for child in from.entries {
            self.add_entry(child, overwrite);
        }
    }

    /// Assign values of the children matching `keys` into the keys' targets.
    ///
    /// Only plain children are considered; the first match for each key wins.
    /// Values a key rejects are reported as warnings and logged.
    pub fn parse_key_values(&self, keys: &mut [&mut dyn CfgKey]) -> KeyReport {
        let mut report = KeyReport::default();
        for key in keys.iter_mut() {
            let Some(found) = self.find_entry(key.name(), false, None) else {
                continue;
            };
            report.found.push(key.name().to_string());
            if let Err(err) = key.parse_value(&found.value) {
                let message = format!("{} for {} in section {}", err, found.name, self.name);
                warn!(
                    source = %found.source_name,
                    line = found.line,
                    "{}",
                    message
                );
                report.errors.push(Diagnostic::warning(
                    &found.source_name,
                    found.line,
                    message,
                ));
            }
        }
        report
    }

    /// Write children as configuration text at `depth` levels of indentation.
    fn write_children(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "    ".repeat(depth);
        for child in &self.entries {
            write!(f, "{}{}", indent, child.name)?;
            if !child.value.is_empty() || child.section.is_none() {
                write!(f, " = \"{}\"", escape(&child.value))?;
            }
            match &child.section {
                Some(section) => {
                    writeln!(f, " {{")?;
                    section.write_children(f, depth + 1)?;
                    writeln!(f, "{}}}", indent)?;
                }
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// Escape a value for output inside double quotes.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            c => out.push(c),
        }
    }
    out
}

impl fmt::Display for Entry {
    /// Render the children as configuration text that parses back to the same tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_children(f, 0)
    }
}

impl<'a> IntoIterator for &'a Entry {
    type Item = &'a Entry;
    type IntoIter = slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
