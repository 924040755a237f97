//! The contract between the tree walker and a transformation plugin.
//!
//! The walker owns traversal order, path mirroring, file handles and stale
//! output tracking. A [`Transform`] owns what happens to each file and what a
//! directory produces once everything under it is done.
//!
//! ## Directory state
//!
//! Each directory gets its own [`Transform::Context`], created by
//! [`begin_directory`](Transform::begin_directory) and consumed by
//! [`end_directory`](Transform::end_directory). The walker keeps the context
//! in the stack frame of the directory being visited and lends the parent's
//! context to the child's `end_directory`, so aggregate results flow upward
//! without any shared, index-addressed stack.

use crate::convert::ConvertError;
use crate::options::OptionsError;
use crate::templates::TemplateError;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Options(#[from] OptionsError),
    #[error("Error processing {path}: {source}")]
    Convert {
        path: PathBuf,
        source: ConvertError,
    },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl TransformError {
    pub fn io(path: &Path, source: io::Error) -> Self {
        TransformError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Errors that abort the whole run rather than a single file.
    ///
    /// Option problems are configuration authoring bugs: a file routed to the
    /// transformation with no option group matching it, or an unreadable or
    /// malformed option file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TransformError::Options(_))
    }
}

/// A source directory and its mirror in the target tree.
#[derive(Debug, Clone)]
pub struct DirPair {
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    /// Path relative to both roots; empty for the roots themselves.
    pub relative: PathBuf,
    pub dry_run: bool,
}

impl DirPair {
    pub fn is_root(&self) -> bool {
        self.relative.as_os_str().is_empty()
    }
}

/// Open handles for one file, owned by the handler for the duration of the
/// call. Both are closed when dropped, on every exit path.
#[derive(Debug)]
pub struct FileHandles {
    pub source: File,
    pub target: File,
}

/// One file routed to the transformation.
#[derive(Debug)]
pub struct FileJob<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    /// `None` when the run is configured not to open files, the transform
    /// declines handles, or on a dry run.
    pub handles: Option<FileHandles>,
    pub dry_run: bool,
}

/// A per-file transformation with optional directory lifecycle hooks.
pub trait Transform {
    /// Per-directory accumulator.
    type Context: Default;

    /// Name of the target file for a source file name.
    fn map_filename(&self, name: &str) -> String {
        name.to_string()
    }

    /// Whether the walker should open source and target for [`handle`](Transform::handle).
    ///
    /// Opening the target truncates it, so transforms that write by path
    /// return `false` to leave the previous output alone until they replace it.
    fn wants_handles(&self) -> bool {
        true
    }

    /// Called on entering a directory, before any of its files.
    fn begin_directory(&mut self, _dir: &DirPair) -> Result<Self::Context, TransformError> {
        Ok(Self::Context::default())
    }

    /// Transform a single file.
    fn handle(&mut self, ctx: &mut Self::Context, job: FileJob<'_>) -> Result<(), TransformError>;

    /// Called after `handle` once the target has been recorded as produced.
    fn post_process(
        &mut self,
        _ctx: &mut Self::Context,
        _source: &Path,
        _target: &Path,
        _dry_run: bool,
    ) -> Result<(), TransformError> {
        Ok(())
    }

    /// Called after the directory's files and all of its subdirectories.
    ///
    /// `parent` is `None` only for the root. Returns any extra files written
    /// into the target tree (indices, feeds) so they count as produced.
    fn end_directory(
        &mut self,
        _dir: &DirPair,
        _ctx: Self::Context,
        _parent: Option<&mut Self::Context>,
    ) -> Result<Vec<PathBuf>, TransformError> {
        Ok(Vec::new())
    }
}
