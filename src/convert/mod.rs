//! Markdown to HTML conversion backends.
//!
//! The [`Converter`] trait is the seam between the publish plugin and whatever
//! actually turns one source file into one HTML file:
//!
//! - [`PandocConverter`]: runs an external converter binary with the resolved
//!   per-file options as its argument vector (no shell involved)
//! - [`BuiltinConverter`]: renders in-process with pulldown-cmark
//!
//! Both write the target file themselves; the caller only checks the result.

mod builtin;
mod pandoc;

pub use builtin::BuiltinConverter;
pub use pandoc::PandocConverter;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// One conversion: the resolved option text for `source` plus an optional
/// converter override from the option file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequest<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub options: &'a str,
    pub program: Option<&'a str>,
}

impl ConvertRequest<'_> {
    /// Option text split on whitespace into separate arguments.
    pub fn args(&self) -> Vec<String> {
        self.options.split_whitespace().map(str::to_string).collect()
    }
}

/// Trait for conversion backends.
pub trait Converter {
    /// Produce `request.target` from `request.source`.
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<(), ConvertError>;
}

/// Which backend a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    #[default]
    Pandoc,
    Builtin,
}

/// Either backend, chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum AnyConverter {
    Pandoc(PandocConverter),
    Builtin(BuiltinConverter),
}

impl AnyConverter {
    pub fn new(kind: ConverterKind, pandoc_binary: &str) -> Self {
        match kind {
            ConverterKind::Pandoc => AnyConverter::Pandoc(PandocConverter::new(pandoc_binary)),
            ConverterKind::Builtin => AnyConverter::Builtin(BuiltinConverter),
        }
    }

    /// The pandoc binary, or `builtin`.
    pub fn name(&self) -> &str {
        match self {
            AnyConverter::Pandoc(c) => c.binary(),
            AnyConverter::Builtin(_) => "builtin",
        }
    }
}

impl Converter for AnyConverter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<(), ConvertError> {
        match self {
            AnyConverter::Pandoc(c) => c.convert(request),
            AnyConverter::Builtin(c) => c.convert(request),
        }
    }
}
