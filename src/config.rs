//! Run configuration.
//!
//! A run is configured in three layers, each overriding the one before:
//!
//! 1. stock defaults ([`PressConfig::default`])
//! 2. `tree-press.toml` in the root directory, if present
//! 3. `-o key=value[,key=value...]` overrides from the command line
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! n_recent = 10                       # Posts kept in recent indices and the feed
//! template_dir = ""                   # Relative to the root directory; "" = root itself
//! content_start = '<div id="content">' # Regex: descriptions start after this line
//! description_words = 200             # Word budget for descriptions
//! min_interesting_size = 0            # Bytes; only larger posts enter recent lists
//! converter = "pandoc"                # "pandoc" or "builtin"
//! pandoc_binary = "pandoc"            # Used by the pandoc converter
//! base_url = ""                       # Exposed to templates as base_url
//!
//! [extra]                             # Free-form strings, also usable as $NAME macros
//! ```
//!
//! Unknown keys are rejected in the file. On the command line, keys that are
//! not options above land in `extra` instead, so plugins can take private
//! settings without a schema change.

use crate::convert::ConverterKind;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "tree-press.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid override '{item}': {reason}")]
    Override { item: String, reason: String },
}

/// Typed configuration shared by the walker front end and the plugins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PressConfig {
    /// Capacity of every recent list, site-wide and per directory.
    pub n_recent: usize,
    /// Template directory relative to the root directory.
    pub template_dir: String,
    /// Regex for the line after which descriptions start.
    pub content_start: String,
    /// Descriptions stop once they exceed this many words.
    pub description_words: usize,
    /// Posts must be strictly larger than this to be listed as recent.
    pub min_interesting_size: u64,
    pub converter: ConverterKind,
    pub pandoc_binary: String,
    pub base_url: String,
    /// Plugin-private settings.
    pub extra: BTreeMap<String, String>,
}

impl Default for PressConfig {
    fn default() -> Self {
        Self {
            n_recent: 10,
            template_dir: String::new(),
            content_start: r#"<div id="content">"#.to_string(),
            description_words: 200,
            min_interesting_size: 0,
            converter: ConverterKind::default(),
            pandoc_binary: "pandoc".to_string(),
            base_url: String::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl PressConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_recent == 0 {
            return Err(ConfigError::Validation("n_recent must be at least 1".into()));
        }
        if self.description_words == 0 {
            return Err(ConfigError::Validation(
                "description_words must be at least 1".into(),
            ));
        }
        self.content_start_regex()?;
        Ok(())
    }

    pub fn content_start_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.content_start).map_err(|e| {
            ConfigError::Validation(format!("content_start is not a valid regex: {e}"))
        })
    }

    /// Where templates are read from.
    pub fn template_path(&self, root: &Path) -> PathBuf {
        if self.template_dir.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.template_dir)
        }
    }
}

// =============================================================================
// Layering: defaults, tree-press.toml, -o overrides
// =============================================================================

/// Layer 1: every [`PressConfig`] default as a TOML table. Override values
/// are coerced against it, so it also serves as the type schema for `-o`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(PressConfig::default()).expect("PressConfig defaults are plain TOML")
}

/// Lay one config layer over another.
///
/// A scalar in `overlay` replaces the lower layer's value. The `extra` table
/// combines entry by entry, so a macro set in `tree-press.toml` survives an
/// `-o` override that sets a different one.
pub fn merge_toml(lower: toml::Value, overlay: toml::Value) -> toml::Value {
    match (lower, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(upper)) => {
            for (key, value) in upper {
                let value = match merged.remove(&key) {
                    Some(below) => merge_toml(below, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Layer 2: `tree-press.toml` in the site root, untyped so it can be merged
/// before validation. `None` when the site has no config file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&text)?))
}

/// Turn `key=value[,key=value...]` arguments into a TOML overlay.
///
/// Values take the type of the stock default for their key; a bare `key`
/// means `true`. Keys that are not config fields go to `extra`.
pub fn parse_overrides(args: &[String]) -> Result<toml::Value, ConfigError> {
    let stock = stock_defaults_value();
    let mut table = toml::Table::new();
    let mut extra = toml::Table::new();

    for item in args.iter().flat_map(|a| a.split(',')).map(str::trim) {
        if item.is_empty() {
            continue;
        }
        let (key, raw) = item.split_once('=').unwrap_or((item, "true"));
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Override {
                item: item.to_string(),
                reason: "missing key".into(),
            });
        }
        match stock.get(key) {
            Some(toml::Value::Table(_)) => {
                return Err(ConfigError::Override {
                    item: item.to_string(),
                    reason: format!("'{key}' is a table"),
                });
            }
            Some(default) => {
                let value = coerce(default, raw).map_err(|reason| ConfigError::Override {
                    item: item.to_string(),
                    reason,
                })?;
                table.insert(key.to_string(), value);
            }
            None => {
                extra.insert(key.to_string(), toml::Value::String(raw.to_string()));
            }
        }
    }

    if !extra.is_empty() {
        table.insert("extra".to_string(), toml::Value::Table(extra));
    }
    Ok(toml::Value::Table(table))
}

fn coerce(default: &toml::Value, raw: &str) -> Result<toml::Value, String> {
    match default {
        toml::Value::Integer(_) => raw
            .parse::<i64>()
            .map(toml::Value::Integer)
            .map_err(|_| format!("expected an integer, got '{raw}'")),
        toml::Value::Boolean(_) => raw
            .parse::<bool>()
            .map(toml::Value::Boolean)
            .map_err(|_| format!("expected true or false, got '{raw}'")),
        toml::Value::Float(_) => raw
            .parse::<f64>()
            .map(toml::Value::Float)
            .map_err(|_| format!("expected a number, got '{raw}'")),
        _ => Ok(toml::Value::String(raw.to_string())),
    }
}

/// Merge optional overlays onto a base value in order, then deserialize and
/// validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = Option<toml::Value>>,
) -> Result<PressConfig, ConfigError> {
    let merged = overlays.into_iter().flatten().fold(base, merge_toml);
    let config: PressConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration for a run rooted at `root`.
pub fn load_config(root: &Path, overrides: &[String]) -> Result<PressConfig, ConfigError> {
    let file = load_raw_config(root)?;
    let cli = parse_overrides(overrides)?;
    resolve_config(stock_defaults_value(), [file, Some(cli)])
}

/// Returns a fully-commented stock `tree-press.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# tree-press configuration
# ========================
# Place this file as tree-press.toml in the root directory of a run.
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.
#
# Any key can also be set for a single run from the command line:
#   tree-press run ... -o n_recent=5,converter=builtin

# Number of posts listed in recent indices and in the feed.
n_recent = 10

# Directory holding index_template.html, section_index_template.html and
# feed_template.xml, relative to the root directory. Empty means the root.
template_dir = ""

# Regular expression marking the line in generated HTML after which a
# post's description starts.
content_start = '<div id="content">'

# Descriptions stop at the first line that takes them past this many words.
description_words = 200

# Posts no larger than this (in bytes) are left out of recent lists.
min_interesting_size = 0

# "pandoc" runs an external converter per post; "builtin" renders markdown
# in-process and ignores per-file options.
converter = "pandoc"

# Converter binary. A "pandoc: <binary>" line in an option file overrides
# this for its directory and everything below it.
pandoc_binary = "pandoc"

# Site URL, available to templates as base_url (useful in feeds).
base_url = ""

# Free-form settings. Each entry is also a $NAME macro in option files.
[extra]
# AUTHOR = "Jane Doe"
"##
}
