//! Runtime templates for the generated index pages and feed.
//!
//! Three templates are read from the site's template directory when a run
//! starts, and every one of them must exist:
//!
//! | File | Renders |
//! |------|---------|
//! | `section_index_template.html` | `_section_index.html`: every post in a directory |
//! | `index_template.html` | `_recent_index.html`: most recent posts |
//! | `feed_template.xml` | `feed.xml`: site-wide recent posts, root only |
//!
//! Templates use minijinja syntax and see an [`IndexPage`]: `title`,
//! `container_id`, `base_url` and `posts`, a list of
//! [`IndexEntry`](crate::summary::IndexEntry) records (`link`, `title`,
//! `date`, `sortable_date`, `pub_date`, `description`). Values are
//! HTML-escaped in both the `.html` and `.xml` templates.

use crate::summary::IndexEntry;
use minijinja::Environment;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SECTION_TEMPLATE: &str = "section_index_template.html";
pub const INDEX_TEMPLATE: &str = "index_template.html";
pub const FEED_TEMPLATE: &str = "feed_template.xml";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("missing template: {0}")]
    Missing(PathBuf),
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template {name}: {source}")]
    Render {
        name: &'static str,
        source: minijinja::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    SectionIndex,
    RecentIndex,
    Feed,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::SectionIndex,
        TemplateKind::RecentIndex,
        TemplateKind::Feed,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateKind::SectionIndex => SECTION_TEMPLATE,
            TemplateKind::RecentIndex => INDEX_TEMPLATE,
            TemplateKind::Feed => FEED_TEMPLATE,
        }
    }
}

/// Everything a template can reference.
#[derive(Debug, Serialize)]
pub struct IndexPage<'a> {
    pub title: Option<&'a str>,
    pub container_id: Option<&'a str>,
    pub base_url: &'a str,
    pub posts: &'a [IndexEntry],
}

/// The three loaded and parsed templates.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Read all templates from `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let read = |kind: TemplateKind| -> Result<String, TemplateError> {
            let path = dir.join(kind.file_name());
            if !path.is_file() {
                return Err(TemplateError::Missing(path));
            }
            fs::read_to_string(&path).map_err(|source| TemplateError::Io { path, source })
        };
        Self::from_sources(
            read(TemplateKind::SectionIndex)?,
            read(TemplateKind::RecentIndex)?,
            read(TemplateKind::Feed)?,
        )
    }

    /// Build from template text, rejecting syntax errors up front.
    pub fn from_sources(section: String, recent: String, feed: String) -> Result<Self, TemplateError> {
        let mut env = Environment::new();
        for (kind, source) in TemplateKind::ALL.into_iter().zip([section, recent, feed]) {
            env.add_template_owned(kind.file_name(), source)
                .map_err(|source| TemplateError::Render {
                    name: kind.file_name(),
                    source,
                })?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, kind: TemplateKind, page: &IndexPage<'_>) -> Result<String, TemplateError> {
        let render_error = |source| TemplateError::Render {
            name: kind.file_name(),
            source,
        };
        self.env
            .get_template(kind.file_name())
            .map_err(render_error)?
            .render(page)
            .map_err(render_error)
    }
}
