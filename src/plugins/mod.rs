//! Built-in transformation plugins and the registry the CLI selects from.
//!
//! | Name | Plugin |
//! |------|--------|
//! | `publish-html` | [`PublishHtml`]: markdown posts to HTML with indices and a feed |
//! | `copy` | [`CopyFiles`]: byte-for-byte mirror, preserving timestamps |

mod copy;
mod publish;

pub use copy::CopyFiles;
pub use publish::{FEED, PublishHtml, RECENT_INDEX, SECTION_INDEX, Section};

use crate::config::{ConfigError, PressConfig};
use crate::convert::AnyConverter;
use crate::templates::TemplateError;
use crate::walk::{WalkError, WalkOptions, WalkReport, walk};
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Walk(#[from] WalkError),
}

/// Statically registered plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PluginKind {
    PublishHtml,
    Copy,
}

impl PluginKind {
    pub const ALL: [PluginKind; 2] = [PluginKind::PublishHtml, PluginKind::Copy];

    pub fn name(self) -> &'static str {
        match self {
            PluginKind::PublishHtml => "publish-html",
            PluginKind::Copy => "copy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PluginKind::PublishHtml => {
                "Convert markdown posts to HTML and write section indices, recent indices and a feed"
            }
            PluginKind::Copy => "Mirror matching files unchanged, preserving timestamps",
        }
    }
}

/// The three directories of a run. Source and target are given relative to
/// the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub target_root: PathBuf,
}

impl Site {
    pub fn new(root: &Path, source: &Path, target: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            source_root: root.join(source),
            target_root: root.join(target),
        }
    }
}

/// Run one plugin over a site.
pub fn run(
    kind: PluginKind,
    site: &Site,
    options: &WalkOptions,
    config: &PressConfig,
) -> Result<WalkReport, PluginError> {
    let report = match kind {
        PluginKind::PublishHtml => {
            let converter = AnyConverter::new(config.converter, &config.pandoc_binary);
            info!("Converter: {}", converter.name());
            let mut plugin = PublishHtml::new(site, config, converter)?;
            walk(&site.source_root, &site.target_root, options, &mut plugin)?
        }
        PluginKind::Copy => walk(&site.source_root, &site.target_root, options, &mut CopyFiles)?,
    };
    Ok(report)
}

/// Give `target` the access and modification times of `source`.
pub fn copy_timestamps(source: &Path, target: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    File::options().write(true).open(target)?.set_times(times)
}
