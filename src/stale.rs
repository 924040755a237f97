//! Stale output tracking.
//!
//! Before a target directory is written, every file in it matching the
//! removal pattern is marked as *existing*. Every target produced during the
//! run is recorded as *processed*. Once the whole traversal has finished,
//! `existing \ processed` are the orphans: outputs whose source was removed or
//! renamed. Marking per directory and diffing only at the end means a file
//! that simply hasn't been reached yet is never mistaken for an orphan.

use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct StaleOutputs {
    pattern: Option<Regex>,
    existing: BTreeSet<PathBuf>,
    processed: HashSet<PathBuf>,
}

impl StaleOutputs {
    /// Without a pattern nothing is ever marked, so nothing is ever removed.
    pub fn new(pattern: Option<Regex>) -> Self {
        Self {
            pattern,
            existing: BTreeSet::new(),
            processed: HashSet::new(),
        }
    }

    /// Record the removable files currently present in `dir`.
    ///
    /// A missing directory is not an error: it simply has nothing to mark.
    pub fn mark_existing(&mut self, dir: &Path) -> io::Result<()> {
        let Some(pattern) = &self.pattern else {
            return Ok(());
        };
        if !dir.is_dir() {
            return Ok(());
        }
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if pattern.is_match(&name.to_string_lossy()) {
                self.existing.insert(dir.join(&name));
            }
        }
        Ok(())
    }

    /// Record a target as produced during this run.
    pub fn record(&mut self, target: &Path) {
        self.processed.insert(target.to_path_buf());
    }

    /// Marked files that were not produced this run, in path order.
    pub fn stale(&self) -> Vec<PathBuf> {
        self.existing
            .iter()
            .filter(|p| !self.processed.contains(*p))
            .cloned()
            .collect()
    }

    /// Delete the stale files (or only report them on a dry run).
    ///
    /// Returns the paths removed, or that would have been removed.
    /// Individual failures are logged and skipped.
    pub fn prune(&self, execute: bool) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in self.stale() {
            if !execute {
                info!("Would remove {}", path.display());
                removed.push(path);
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("Removed {}", path.display());
                    removed.push(path);
                }
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
        removed
    }
}
