//! Per-directory converter options.
//!
//! Any source directory may carry a `.pandoc_options` file. Directories
//! without one inherit the nearest ancestor's file; the resolver memoizes the
//! inheritance so each directory costs one lookup.
//!
//! ## File format
//!
//! ```text
//! # comments and blank lines are ignored
//! pandoc: /opt/pandoc/bin/pandoc
//! --standalone
//! ::/drafts/::
//! --toc
//! -c $ROOTDIR/style.css
//! ```
//!
//! `pandoc:` is a directive overriding the converter binary. A line of the
//! form `::PATTERN::` opens a group for source paths matching `PATTERN`;
//! option lines before the first group form a catch-all group.
//! Each non-directive line is appended (space-prefixed) to the current
//! group's option text. A file resolves to the text of the *first* group whose
//! pattern matches its full path.
//!
//! ## Macros
//!
//! `$NAME` tokens are replaced verbatim with the values of `ROOTDIR`,
//! `SOURCEROOT`, `TARGETROOT`, `SOURCEDIR`, `TARGETDIR` and any extra macros.
//! Expansion happens on a copy of the cached list, so an inherited list expands
//! relative to the inheriting directory.

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;
use tracing::info;

pub const OPTIONS_FILENAME: &str = ".pandoc_options";

/// Directive naming the converter executable.
pub const CONVERTER_DIRECTIVE: &str = "pandoc";

#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid pattern '{pattern}' in {path}: {source}")]
    Pattern {
        path: PathBuf,
        pattern: String,
        source: regex::Error,
    },
    #[error("No options found for {file}: {considered}")]
    NoMatch { file: PathBuf, considered: String },
}

/// A `(pattern, option text)` pair.
#[derive(Debug, Clone)]
pub struct OptionGroup {
    pub pattern: Regex,
    pub text: String,
}

/// The parsed contents of one option file.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    pub groups: Vec<OptionGroup>,
    /// Converter binary named by the `pandoc:` directive, if any.
    pub converter: Option<String>,
}

impl OptionSet {
    pub fn parse(content: &str, path: &Path) -> Result<Self, OptionsError> {
        let mut set = OptionSet::default();
        for raw in content.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(value) = directive_value(line, CONVERTER_DIRECTIVE) {
                info!("Using converter {value} (from {})", path.display());
                set.converter = Some(value.to_string());
                continue;
            }
            if let Some(pattern) = group_pattern(line) {
                let regex = Regex::new(pattern).map_err(|source| OptionsError::Pattern {
                    path: path.to_path_buf(),
                    pattern: pattern.to_string(),
                    source,
                })?;
                set.groups.push(OptionGroup {
                    pattern: regex,
                    text: String::new(),
                });
                continue;
            }
            if set.groups.is_empty() {
                set.groups.push(OptionGroup {
                    pattern: catch_all(),
                    text: String::new(),
                });
            }
            if let Some(group) = set.groups.last_mut() {
                group.text.push(' ');
                group.text.push_str(line);
            }
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Copy of this set with macros expanded in every group's text.
    pub fn expanded(&self, macros: &Macros) -> OptionSet {
        OptionSet {
            groups: self
                .groups
                .iter()
                .map(|g| OptionGroup {
                    pattern: g.pattern.clone(),
                    text: macros.expand(&g.text),
                })
                .collect(),
            converter: self.converter.as_deref().map(|c| macros.expand(c)),
        }
    }

    /// Option text of the first group matching `file`.
    pub fn options_for(&self, file: &Path) -> Result<&str, OptionsError> {
        let name = file.to_string_lossy();
        self.groups
            .iter()
            .find(|g| g.pattern.is_match(&name))
            .map(|g| g.text.as_str())
            .ok_or_else(|| OptionsError::NoMatch {
                file: file.to_path_buf(),
                considered: self.to_string(),
            })
    }
}

impl fmt::Display for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "::{}::{}", group.pattern.as_str(), group.text)?;
        }
        write!(f, "]")
    }
}

fn catch_all() -> Regex {
    Regex::new(".*").expect("catch-all pattern is valid")
}

/// `::PATTERN::` → `PATTERN`.
fn group_pattern(line: &str) -> Option<&str> {
    line.strip_prefix("::")?.strip_suffix("::")
}

/// `name: value` → `value` when `name` is the given directive.
fn directive_value<'a>(line: &'a str, directive: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(directive)?.strip_prefix(':')?;
    Some(rest.trim())
}

/// Ordered `$NAME` → value substitutions.
#[derive(Debug, Clone, Default)]
pub struct Macros {
    entries: Vec<(String, String)>,
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a macro, replacing an earlier value of the same name in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Plain substitution in insertion order: no escaping, no recursion.
    pub fn expand(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (name, value) in &self.entries {
            out = out.replace(&format!("${name}"), value);
        }
        out
    }
}

/// Memoizing nearest-ancestor lookup of option files.
#[derive(Debug, Default)]
pub struct OptionResolver {
    cache: HashMap<PathBuf, Rc<OptionSet>>,
}

impl OptionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options governing `source_dir`, expanded with `macros`.
    ///
    /// Returns an empty set when neither the directory nor any already
    /// visited ancestor has an option file.
    pub fn resolve(&mut self, source_dir: &Path, macros: &Macros) -> Result<OptionSet, OptionsError> {
        let local = source_dir.join(OPTIONS_FILENAME);
        let set = if local.is_file() {
            let content = fs::read_to_string(&local).map_err(|source| OptionsError::Io {
                path: local.clone(),
                source,
            })?;
            Rc::new(OptionSet::parse(&content, &local)?)
        } else {
            match source_dir.parent().and_then(|p| self.cache.get(p)) {
                Some(inherited) => Rc::clone(inherited),
                None => return Ok(OptionSet::default()),
            }
        };
        let expanded = set.expanded(macros);
        self.cache.insert(source_dir.to_path_buf(), set);
        Ok(expanded)
    }
}
