//! Per-post summaries and the records index templates are rendered from.
//!
//! A [`FileSummary`] is taken from the *source* file when it is handled
//! (title, timestamp, size). Its description comes later, from the generated
//! *output*: everything after the first line matching the content-start marker,
//! up to a word budget, with markup stripped.

use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub source: PathBuf,
    pub target: PathBuf,
    pub title: String,
    pub modified: DateTime<Local>,
    pub size: u64,
    pub description: Option<String>,
}

impl FileSummary {
    /// Summarize `source`, which is published as `target`.
    pub fn from_source(source: &Path, target: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(source)?;
        let bytes = fs::read(source)?;
        let title = extract_title(&String::from_utf8_lossy(&bytes)).unwrap_or_else(|| {
            source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        });
        Ok(Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            title,
            modified: DateTime::from(metadata.modified()?),
            size: metadata.len(),
            description: None,
        })
    }

    /// e.g. `Jan 02, 2024`
    pub fn printable_date(&self) -> String {
        self.modified.format("%b %d, %Y").to_string()
    }

    /// e.g. `2024/01/02`
    pub fn sortable_date(&self) -> String {
        self.modified.format("%Y/%m/%d").to_string()
    }

    /// RFC 2822, as feeds expect.
    pub fn pub_date(&self) -> String {
        self.modified.to_rfc2822()
    }

    /// Rooted link to the output: `/` + target path relative to `target_root`.
    pub fn web_link(&self, target_root: &Path) -> String {
        let relative = self.target.strip_prefix(target_root).unwrap_or(&self.target);
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        format!("/{}", parts.join("/"))
    }

    /// Fill in the description from the generated target.
    pub fn fetch_description(&mut self, start: &Regex, max_words: usize) -> io::Result<()> {
        let html = fs::read_to_string(&self.target)?;
        self.description = extract_description(&html, start, max_words);
        Ok(())
    }

    pub fn entry(&self, target_root: &Path) -> IndexEntry {
        IndexEntry {
            link: self.web_link(target_root),
            title: self.title.clone(),
            date: self.printable_date(),
            sortable_date: self.sortable_date(),
            pub_date: self.pub_date(),
            description: self.description.clone(),
        }
    }
}

/// One post as seen by an index template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub link: String,
    pub title: String,
    pub date: String,
    pub sortable_date: String,
    pub pub_date: String,
    pub description: Option<String>,
}

/// Title from the first line starting with `% `.
pub fn extract_title(text: &str) -> Option<String> {
    text.lines()
        .find_map(|line| line.strip_prefix("% "))
        .map(|title| title.trim().to_string())
}

/// Plain text following the first line matching `start`.
///
/// Lines are collected until the running word count exceeds `max_words`
/// (the line that crosses the budget is kept). `None` when the marker never
/// appears.
pub fn extract_description(html: &str, start: &Regex, max_words: usize) -> Option<String> {
    let mut lines = html.lines();
    lines.by_ref().find(|line| start.is_match(line))?;

    let mut words = 0;
    let mut kept = Vec::new();
    for line in lines {
        let plain = strip_html_tags(line);
        words += plain.split_whitespace().count();
        let plain = plain.trim();
        if !plain.is_empty() {
            kept.push(plain.to_string());
        }
        if words > max_words {
            break;
        }
    }
    Some(kept.join("\n"))
}

/// Strip HTML tags from a string, leaving only text content.
fn strip_html_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}
