//! Modification-time tracking for files that contributed to a parse.

use std::{
    fs,
    path::{self, Path, PathBuf},
    time::SystemTime,
};

use tracing::trace;

/// Absolute form of `file`, canonicalized when it exists.
pub fn absolute(file: &Path) -> PathBuf {
    fs::canonicalize(file)
        .or_else(|_| path::absolute(file))
        .unwrap_or_else(|_| file.to_path_buf())
}

/// Modification time of `path`, if it can be read.
fn mtime_of(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Files visited during a parse with the modification time each had when read.
///
/// Command sources are never recorded: their output can change without any
/// file changing, which is what the parser's dynamic-content flag reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeFiles {
    /// Newest modification time seen.
    mtime: Option<SystemTime>,
    /// Absolute paths in visit order; the first is the top-level file.
    files: Vec<PathBuf>,
    /// Modification time of each entry of `files` when it was recorded.
    stamps: Vec<Option<SystemTime>>,
}

impl TimeFiles {
    /// Newest modification time seen across tracked files.
    pub fn mtime(&self) -> Option<SystemTime> {
        self.mtime
    }

    /// Tracked files in visit order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Record a visited file.
    pub fn add(&mut self, path: &Path) {
        let path = absolute(path);
        if self.files.contains(&path) {
            return;
        }
        let stamp = mtime_of(&path);
        if let Some(t) = stamp {
            self.mtime = Some(self.mtime.map_or(t, |m| m.max(t)));
        }
        trace!(path = %path.display(), "tracking file");
        self.files.push(path);
        self.stamps.push(stamp);
    }

    /// True if the configuration rooted at `file` must be parsed again.
    ///
    /// That is the case when nothing is tracked, when `file` is not the
    /// tracked top-level file, or when any tracked file is gone or its
    /// modification time differs from the one recorded for it.
    pub fn require_reload(&self, file: &Path) -> bool {
        let Some(first) = self.files.first() else {
            return true;
        };
        if *first != absolute(file) {
            return true;
        }
        self.files
            .iter()
            .zip(&self.stamps)
            .any(|(f, recorded)| match mtime_of(f) {
                Some(t) => Some(t) != *recorded,
                None => true,
            })
    }

    /// Forget everything tracked.
    pub fn clear(&mut self) {
        self.files.clear();
        self.stamps.clear();
        self.mtime = None;
    }
}
