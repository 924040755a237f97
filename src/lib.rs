//! # tree-press
//!
//! Mirror a source directory tree into a target tree through a pluggable
//! per-file transformation, and publish a tree of markdown posts as an HTML
//! site with chronological indices and a feed.
//!
//! # Architecture: Walker and Plugins
//!
//! The [`walk`] module owns traversal: it visits directories depth-first,
//! hands every matching file to a [`transform::Transform`] plugin, and
//! finalizes each directory only after all of its descendants. Each directory
//! gets its own plugin context, and a child's finalization can write into its
//! parent's, so plugins aggregate bottom-up without shared mutable state.
//!
//! ```text
//! src/                          public/
//! ├── .pandoc_options           ├── _section_index.html
//! ├── posts/                    ├── _recent_index.html   (site-wide)
//! │   ├── 2024-01-01-a.md  →    ├── feed.xml
//! │   └── 2024-01-02-b.md  →    └── posts/
//! └── ...                           ├── 2024-01-01-a.html
//!                                   ├── 2024-01-02-b.html
//!                                   ├── _section_index.html
//!                                   └── _recent_index.html
//! ```
//!
//! Targets that match a removal pattern but were not produced by the run are
//! pruned at the end ([`stale`]).
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Depth-first mirroring walker, produces a [`walk::WalkReport`] |
//! | [`transform`] | Plugin contract: `Transform` trait, per-file jobs, error classes |
//! | [`stale`] | Existing vs produced target bookkeeping and pruning |
//! | [`recent`] | Bounded most-recent-N collector |
//! | [`options`] | `.pandoc_options` parsing, `$NAME` macros, nearest-ancestor inheritance |
//! | [`summary`] | Post summaries: titles, dates, links, descriptions |
//! | [`templates`] | Runtime minijinja templates for indices and the feed |
//! | [`convert`] | Markdown to HTML backends: external pandoc or built-in pulldown-cmark |
//! | [`plugins`] | Plugin registry: `publish-html` and `copy` |
//! | [`config`] | `tree-press.toml` loading, `-o key=value` overrides, validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Runtime Templates
//!
//! Index pages and the feed are rendered from template files in the site,
//! not compiled in: a blog's look belongs to the blog. Post pages come from
//! the converter, which with pandoc takes its own template through the
//! option file.
//!
//! ## Option Files Inherit by Nearest Ancestor
//!
//! A directory without a `.pandoc_options` file uses the one its nearest
//! visited ancestor used, including any `pandoc:` converter override. A post
//! with no matching option group stops the run: silently publishing with the
//! wrong options is worse than not publishing.
//!
//! ## Dry Run by Default
//!
//! Without `--execute` nothing in the target tree is created, written or
//! removed. Option files are still resolved, so configuration mistakes show
//! up before anything is touched.

pub mod config;
pub mod convert;
pub mod options;
pub mod output;
pub mod plugins;
pub mod recent;
pub mod stale;
pub mod summary;
pub mod templates;
pub mod transform;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
