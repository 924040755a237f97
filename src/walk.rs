//! Depth-first mirroring of a source tree into a target tree.
//!
//! For every directory, in order:
//!
//! 1. mark removable files already present in the target directory
//! 2. [`Transform::begin_directory`]
//! 3. handle each matching file (entries sorted by name): map the file name,
//!    hand the file to [`Transform::handle`] (with open handles only when the
//!    run opens files and [`Transform::wants_handles`]), record the target as
//!    produced, then [`Transform::post_process`]
//! 4. recurse into subdirectories (when recursion is on), in name order
//! 5. [`Transform::end_directory`], with the parent's context
//!
//! So a directory is finalized strictly after all its files and all its
//! descendants, which is what lets plugins aggregate bottom-up. Once the root
//! is finalized, stale outputs are pruned.
//!
//! ## Failures
//!
//! Missing roots abort before anything is touched. A fatal transform error
//! (see [`TransformError::is_fatal`]) aborts the run. Any other per-file error
//! is logged, the file is listed in [`WalkReport::failed`], and its target is
//! still counted as produced so pruning never deletes it.

use crate::stale::StaleOutputs;
use crate::transform::{DirPair, FileHandles, FileJob, Transform, TransformError};
use regex::Regex;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("no such directory: {0}")]
    MissingRoot(PathBuf),
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// How a walk selects and treats files.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Matched against the full source path of each file.
    pub file_pattern: Regex,
    /// Matched against target file names; matches not produced this run are
    /// removed at the end.
    pub remove_pattern: Option<Regex>,
    pub recurse: bool,
    /// Open source and target handles for the handler.
    pub open_files: bool,
    /// Without this, nothing in the target tree is created, written or removed.
    pub execute: bool,
}

impl WalkOptions {
    pub fn new(file_pattern: Regex) -> Self {
        Self {
            file_pattern,
            remove_pattern: None,
            recurse: false,
            open_files: true,
            execute: false,
        }
    }
}

/// What a walk did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkReport {
    pub directories: usize,
    pub files: usize,
    /// Source files whose transformation failed.
    pub failed: Vec<PathBuf>,
    /// Stale outputs removed (or, on a dry run, that would be removed).
    pub removed: Vec<PathBuf>,
    pub dry_run: bool,
}

/// Walk `source_root`, mirroring matching files into `target_root`.
pub fn walk<T: Transform>(
    source_root: &Path,
    target_root: &Path,
    options: &WalkOptions,
    transform: &mut T,
) -> Result<WalkReport, WalkError> {
    for root in [source_root, target_root] {
        if !root.is_dir() {
            return Err(WalkError::MissingRoot(root.to_path_buf()));
        }
    }

    let mut walker = Walker {
        source_root,
        target_root,
        options,
        transform,
        stale: StaleOutputs::new(options.remove_pattern.clone()),
        report: WalkReport {
            dry_run: !options.execute,
            ..WalkReport::default()
        },
    };
    walker.visit(Path::new(""), None)?;

    let mut report = walker.report;
    report.removed = walker.stale.prune(options.execute);
    Ok(report)
}

struct Walker<'a, T: Transform> {
    source_root: &'a Path,
    target_root: &'a Path,
    options: &'a WalkOptions,
    transform: &'a mut T,
    stale: StaleOutputs,
    report: WalkReport,
}

impl<T: Transform> Walker<'_, T> {
    fn visit(&mut self, relative: &Path, parent: Option<&mut T::Context>) -> Result<(), WalkError> {
        let dir = DirPair {
            source_dir: under(self.source_root, relative),
            target_dir: under(self.target_root, relative),
            relative: relative.to_path_buf(),
            dry_run: !self.options.execute,
        };

        self.stale
            .mark_existing(&dir.target_dir)
            .map_err(|source| WalkError::Io {
                path: dir.target_dir.clone(),
                source,
            })?;
        let mut ctx = self.transform.begin_directory(&dir)?;
        self.report.directories += 1;

        let mut subdirs = Vec::new();
        let mut target_ready = dir.target_dir.is_dir();
        for name in sorted_entries(&dir.source_dir)? {
            let source = dir.source_dir.join(&name);
            let is_dir = source.is_dir();
            if is_dir && self.options.recurse {
                subdirs.push(name);
                continue;
            }
            if is_dir || !self.options.file_pattern.is_match(&source.to_string_lossy()) {
                continue;
            }
            let target = dir
                .target_dir
                .join(self.transform.map_filename(&name.to_string_lossy()));
            self.handle_file(&mut ctx, &dir, &source, &target, &mut target_ready)?;
        }

        for name in subdirs {
            self.visit(&relative.join(name), Some(&mut ctx))?;
        }

        let generated = self.transform.end_directory(&dir, ctx, parent)?;
        for path in &generated {
            self.stale.record(path);
        }
        Ok(())
    }

    fn handle_file(
        &mut self,
        ctx: &mut T::Context,
        dir: &DirPair,
        source: &Path,
        target: &Path,
        target_ready: &mut bool,
    ) -> Result<(), WalkError> {
        self.report.files += 1;
        debug!("{} -> {}", source.display(), target.display());

        let outcome = self
            .prepare(dir, source, target, target_ready)
            .and_then(|handles| {
                self.transform.handle(
                    ctx,
                    FileJob {
                        source,
                        target,
                        handles,
                        dry_run: dir.dry_run,
                    },
                )
            });
        // Started counts as produced, even when it failed.
        self.stale.record(target);

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("{e}");
                self.report.failed.push(source.to_path_buf());
                return Ok(());
            }
        }

        match self.transform.post_process(ctx, source, target, dir.dry_run) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("{e}");
                Ok(())
            }
        }
    }

    /// Create the target directory on first use and open handles if asked to.
    fn prepare(
        &self,
        dir: &DirPair,
        source: &Path,
        target: &Path,
        target_ready: &mut bool,
    ) -> Result<Option<FileHandles>, TransformError> {
        if dir.dry_run {
            return Ok(None);
        }
        if !*target_ready {
            fs::create_dir_all(&dir.target_dir)
                .map_err(|e| TransformError::io(&dir.target_dir, e))?;
            *target_ready = true;
        }
        if !self.options.open_files || !self.transform.wants_handles() {
            return Ok(None);
        }
        let source_file = File::open(source).map_err(|e| TransformError::io(source, e))?;
        let target_file = File::create(target).map_err(|e| TransformError::io(target, e))?;
        Ok(Some(FileHandles {
            source: source_file,
            target: target_file,
        }))
    }
}

/// `root` joined with `relative`, without a trailing separator for the root.
fn under(root: &Path, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        root.to_path_buf()
    } else {
        root.join(relative)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<OsString>, WalkError> {
    let io_err = |source| WalkError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()
        .map_err(io_err)?;
    names.sort();
    Ok(names)
}
