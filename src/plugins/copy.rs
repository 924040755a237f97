use super::copy_timestamps;
use crate::transform::{FileJob, Transform, TransformError};
use std::io;
use std::path::Path;
use tracing::debug;

/// Mirrors matching files unchanged.
///
/// Copies through the walker's handles; when files are not opened (dry run or
/// `--no-file-open`) it only reports what it would copy.
#[derive(Debug, Default)]
pub struct CopyFiles;

impl Transform for CopyFiles {
    type Context = ();

    fn handle(&mut self, _ctx: &mut (), job: FileJob<'_>) -> Result<(), TransformError> {
        let Some(mut handles) = job.handles else {
            debug!("Would copy {} -> {}", job.source.display(), job.target.display());
            return Ok(());
        };
        io::copy(&mut handles.source, &mut handles.target)
            .map_err(|e| TransformError::io(job.target, e))?;
        Ok(())
    }

    fn post_process(
        &mut self,
        _ctx: &mut (),
        source: &Path,
        target: &Path,
        dry_run: bool,
    ) -> Result<(), TransformError> {
        if dry_run || !target.exists() {
            return Ok(());
        }
        copy_timestamps(source, target).map_err(|e| TransformError::io(target, e))
    }
}
