//! Markdown posts to a published HTML site.
//!
//! Each `*.md` post becomes `*.html` through a [`Converter`], using the
//! options its directory's option file selects for it. Every directory then
//! gets two generated pages and the root a feed:
//!
//! - `_section_index.html`: all posts in the directory, by title
//!   (case-insensitive)
//! - `_recent_index.html`: the directory's most recent posts; at the root,
//!   the most recent posts of the whole site
//! - `feed.xml` (root only): the site-wide recent list
//!
//! ## Aggregation
//!
//! A directory's recent posts are collected in its [`Section`]. When the
//! directory is finished they get descriptions from their generated output,
//! and are handed to the parent's subtree collector together with everything
//! the directory itself received from below. Both collectors are bounded, so
//! the root ends up with exactly the newest posts of the site.

use super::{PluginError, Site, copy_timestamps};
use crate::config::PressConfig;
use crate::convert::{ConvertRequest, Converter};
use crate::options::{Macros, OptionResolver, OptionSet};
use crate::recent::RecentItems;
use crate::summary::FileSummary;
use crate::templates::{IndexPage, TemplateKind, Templates};
use crate::transform::{DirPair, FileJob, Transform, TransformError};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const SECTION_INDEX: &str = "_section_index.html";
pub const RECENT_INDEX: &str = "_recent_index.html";
pub const FEED: &str = "feed.xml";

const SECTION_TITLE: &str = "All Posts";
const RECENT_TITLE: &str = "Recently Posted";
const CONTAINER_ID: &str = "section-index";

type Recent = RecentItems<DateTime<Local>, FileSummary>;

/// Per-directory state.
#[derive(Debug, Default)]
pub struct Section {
    options: OptionSet,
    posts: Vec<FileSummary>,
    recent: Recent,
    /// Recent posts handed up by subdirectories.
    subtree: Recent,
}

pub struct PublishHtml<C> {
    converter: C,
    templates: Templates,
    resolver: OptionResolver,
    macros: Macros,
    content_start: Regex,
    description_words: usize,
    n_recent: usize,
    min_interesting_size: u64,
    base_url: String,
    target_root: PathBuf,
}

impl<C: Converter> PublishHtml<C> {
    /// Loads templates up front, so a missing one fails the run before any
    /// file is touched.
    pub fn new(site: &Site, config: &PressConfig, converter: C) -> Result<Self, PluginError> {
        let templates = Templates::load(&config.template_path(&site.root))?;

        let mut macros = Macros::new();
        macros.set("ROOTDIR", site.root.to_string_lossy());
        macros.set("SOURCEROOT", site.source_root.to_string_lossy());
        macros.set("TARGETROOT", site.target_root.to_string_lossy());
        for (name, value) in &config.extra {
            macros.set(name.as_str(), value.as_str());
        }

        Ok(Self {
            converter,
            templates,
            resolver: OptionResolver::new(),
            macros,
            content_start: config.content_start_regex()?,
            description_words: config.description_words,
            n_recent: config.n_recent,
            min_interesting_size: config.min_interesting_size,
            base_url: config.base_url.clone(),
            target_root: site.target_root.clone(),
        })
    }

    fn write_index(
        &self,
        path: &Path,
        kind: TemplateKind,
        title: Option<&str>,
        posts: &[FileSummary],
    ) -> Result<(), TransformError> {
        let entries: Vec<_> = posts.iter().map(|p| p.entry(&self.target_root)).collect();
        let page = IndexPage {
            title,
            container_id: title.map(|_| CONTAINER_ID),
            base_url: &self.base_url,
            posts: &entries,
        };
        let rendered = self.templates.render(kind, &page)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| TransformError::io(dir, e))?;
        }
        fs::write(path, rendered).map_err(|e| TransformError::io(path, e))?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    /// Index write failures are logged, not fatal.
    fn write_logged(
        &self,
        written: &mut Vec<PathBuf>,
        path: PathBuf,
        kind: TemplateKind,
        title: Option<&str>,
        posts: &[FileSummary],
    ) {
        match self.write_index(&path, kind, title, posts) {
            Ok(()) => written.push(path),
            Err(e) => error!("Can't generate index {}: {}", path.display(), e),
        }
    }
}

impl<C: Converter> Transform for PublishHtml<C> {
    type Context = Section;

    fn map_filename(&self, name: &str) -> String {
        match name.strip_suffix(".md") {
            Some(stem) => format!("{stem}.html"),
            None => name.to_string(),
        }
    }

    /// The converter writes the target by path.
    fn wants_handles(&self) -> bool {
        false
    }

    fn begin_directory(&mut self, dir: &DirPair) -> Result<Section, TransformError> {
        info!("Processing {}", dir.source_dir.display());
        self.macros.set("SOURCEDIR", dir.source_dir.to_string_lossy());
        self.macros.set("TARGETDIR", dir.target_dir.to_string_lossy());

        let options = self.resolver.resolve(&dir.source_dir, &self.macros)?;
        if options.is_empty() {
            debug!("No option file applies to {}", dir.source_dir.display());
        }
        if let Some(program) = &options.converter {
            debug!("Converter for {}: {}", dir.source_dir.display(), program);
        }
        Ok(Section {
            options,
            posts: Vec::new(),
            recent: RecentItems::new(self.n_recent),
            subtree: RecentItems::new(self.n_recent),
        })
    }

    fn handle(&mut self, ctx: &mut Section, job: FileJob<'_>) -> Result<(), TransformError> {
        let options = ctx.options.options_for(job.source)?;
        let summary = FileSummary::from_source(job.source, job.target)
            .map_err(|e| TransformError::io(job.source, e))?;

        // Indexed even when conversion fails; the previous page stays in place.
        if summary.size > self.min_interesting_size {
            ctx.recent.push(summary.modified, summary.clone());
        }
        ctx.posts.push(summary);

        if job.dry_run {
            info!(
                "Would convert {} -> {} with [{}]",
                job.source.display(),
                job.target.display(),
                options
            );
            return Ok(());
        }

        let request = ConvertRequest {
            source: job.source,
            target: job.target,
            options,
            program: ctx.options.converter.as_deref(),
        };
        self.converter
            .convert(&request)
            .map_err(|source| TransformError::Convert {
                path: job.source.to_path_buf(),
                source,
            })?;
        debug!("Converted {}", job.source.display());
        Ok(())
    }

    fn post_process(
        &mut self,
        _ctx: &mut Section,
        source: &Path,
        target: &Path,
        dry_run: bool,
    ) -> Result<(), TransformError> {
        if dry_run || !target.exists() {
            return Ok(());
        }
        copy_timestamps(source, target).map_err(|e| TransformError::io(target, e))
    }

    fn end_directory(
        &mut self,
        dir: &DirPair,
        mut ctx: Section,
        parent: Option<&mut Section>,
    ) -> Result<Vec<PathBuf>, TransformError> {
        let mut recent = ctx.recent.drain();
        let mut written = Vec::new();

        if dir.dry_run {
            info!(
                "Would write indices for {} ({} posts, {} recent)",
                dir.target_dir.display(),
                ctx.posts.len(),
                recent.len()
            );
        } else {
            ctx.posts
                .sort_by_cached_key(|p| p.title.to_lowercase());
            self.write_logged(
                &mut written,
                dir.target_dir.join(SECTION_INDEX),
                TemplateKind::SectionIndex,
                Some(SECTION_TITLE),
                &ctx.posts,
            );

            for post in &mut recent {
                if let Err(e) = post.fetch_description(&self.content_start, self.description_words) {
                    warn!("No description for {}: {}", post.target.display(), e);
                }
            }
        }

        let handed_up = recent.iter().cloned().map(|p| (p.modified, p));
        match parent {
            Some(parent) => {
                if !dir.dry_run {
                    debug!(
                        "Recent index for {}: {:?}",
                        dir.target_dir.display(),
                        recent.iter().map(|p| &p.target).collect::<Vec<_>>()
                    );
                    self.write_logged(
                        &mut written,
                        dir.target_dir.join(RECENT_INDEX),
                        TemplateKind::RecentIndex,
                        Some(RECENT_TITLE),
                        &recent,
                    );
                }
                let from_below = ctx.subtree.drain().into_iter().map(|p| (p.modified, p));
                parent.subtree.extend(from_below.chain(handed_up));
            }
            None => {
                ctx.subtree.extend(handed_up);
                let site_recent = ctx.subtree.drain();
                if !dir.dry_run {
                    self.write_logged(
                        &mut written,
                        dir.target_dir.join(RECENT_INDEX),
                        TemplateKind::RecentIndex,
                        Some(RECENT_TITLE),
                        &site_recent,
                    );
                    self.write_logged(
                        &mut written,
                        dir.target_dir.join(FEED),
                        TemplateKind::Feed,
                        None,
                        &site_recent,
                    );
                }
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::tests::MockConverter;
    use crate::options::OPTIONS_FILENAME;
    use crate::test_helpers::{listed, relative_files, set_mtime, write_file, write_templates};
    use crate::walk::{WalkError, WalkOptions, WalkReport, walk};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        site: Site,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let site = Site::new(tmp.path(), Path::new("src"), Path::new("public"));
            write_templates(tmp.path());
            fs::create_dir_all(&site.source_root).unwrap();
            fs::create_dir_all(&site.target_root).unwrap();
            Self { _tmp: tmp, site }
        }

        fn post(&self, rel: &str, title: &str, mtime: i64) {
            let content = format!("% {title}\n\nSome words about {title}.\n");
            write_file(&self.site.source_root, rel, &content);
            set_mtime(&self.site.source_root.join(rel), mtime);
        }

        fn options(&self, rel: &str, content: &str) {
            let rel = Path::new(rel).join(OPTIONS_FILENAME);
            write_file(&self.site.source_root, &rel.to_string_lossy(), content);
        }

        fn plugin(&self, config: &PressConfig, mock: MockConverter) -> PublishHtml<MockConverter> {
            PublishHtml::new(&self.site, config, mock).unwrap()
        }

        fn run(
            &self,
            plugin: &mut PublishHtml<MockConverter>,
            execute: bool,
        ) -> Result<WalkReport, WalkError> {
            let options = WalkOptions {
                recurse: true,
                execute,
                remove_pattern: Some(Regex::new(r"\.html$").unwrap()),
                ..WalkOptions::new(Regex::new(r"\.md$").unwrap())
            };
            walk(&self.site.source_root, &self.site.target_root, &options, plugin)
        }

        fn output(&self, rel: &str) -> String {
            fs::read_to_string(self.site.target_root.join(rel)).unwrap()
        }
    }

    #[test]
    fn maps_md_to_html_only() {
        let fx = Fixture::new();
        let plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        assert_eq!(plugin.map_filename("post.md"), "post.html");
        assert_eq!(plugin.map_filename("post.md.bak"), "post.md.bak");
        assert_eq!(plugin.map_filename("notes.txt"), "notes.txt");
    }

    #[test]
    fn publishes_posts_and_indices() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n--standalone\n");
        fx.post("posts/2024-01-02-b.md", "World", 1_704_189_600);
        fx.post("posts/2024-01-01-a.md", "hello", 1_704_103_200);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        let report = fx.run(&mut plugin, true).unwrap();

        assert!(report.failed.is_empty());
        assert_eq!(
            relative_files(&fx.site.target_root),
            vec![
                "_recent_index.html",
                "_section_index.html",
                "feed.xml",
                "posts/2024-01-01-a.html",
                "posts/2024-01-02-b.html",
                "posts/_recent_index.html",
                "posts/_section_index.html",
            ]
        );
        // Case-insensitive by title
        assert_eq!(listed(&fx.output("posts/_section_index.html")), vec!["hello", "World"]);
        // Newest first
        assert_eq!(listed(&fx.output("posts/_recent_index.html")), vec!["World", "hello"]);
        assert_eq!(listed(&fx.output("_recent_index.html")), vec!["World", "hello"]);
        assert_eq!(listed(&fx.output("feed.xml")), vec!["World", "hello"]);
        // Root has no posts of its own
        assert!(listed(&fx.output("_section_index.html")).is_empty());

        let requests = plugin.converter.get_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.args == vec!["--standalone"]));
    }

    #[test]
    fn recent_entries_carry_links_and_descriptions() {
        let fx = Fixture::new();
        fx.options("", "--standalone\n");
        fx.post("posts/a.md", "Hello", 1_704_103_200);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        let recent = fx.output("_recent_index.html");
        assert!(recent.contains("Some words about Hello."));
        assert!(recent.contains("posts&#x2f;a.html") || recent.contains("posts/a.html"));
    }

    #[test]
    fn site_recent_list_is_bounded_and_newest_first() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("a/one.md", "One", 1_000);
        fx.post("a/four.md", "Four", 4_000);
        fx.post("b/two.md", "Two", 2_000);
        fx.post("b/deep/five.md", "Five", 5_000);
        fx.post("three.md", "Three", 3_000);

        let config = PressConfig {
            n_recent: 3,
            ..PressConfig::default()
        };
        let mut plugin = fx.plugin(&config, MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        assert_eq!(listed(&fx.output("_recent_index.html")), vec!["Five", "Four", "Three"]);
        assert_eq!(listed(&fx.output("feed.xml")), vec!["Five", "Four", "Three"]);
        // Directory lists only see their own posts
        assert_eq!(listed(&fx.output("b/_recent_index.html")), vec!["Two"]);
        assert_eq!(listed(&fx.output("b/deep/_recent_index.html")), vec!["Five"]);
    }

    #[test]
    fn small_posts_stay_out_of_recent_lists() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("big.md", "Big one with a much longer title", 2_000);
        write_file(&fx.site.source_root, "tiny.md", "% T\n");

        let config = PressConfig {
            min_interesting_size: 10,
            ..PressConfig::default()
        };
        let mut plugin = fx.plugin(&config, MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        assert_eq!(
            listed(&fx.output("_recent_index.html")),
            vec!["Big one with a much longer title"]
        );
        assert_eq!(listed(&fx.output("_section_index.html")).len(), 2);
    }

    #[test]
    fn unmatched_file_aborts_the_run() {
        let fx = Fixture::new();
        fx.options("", "::\\.txt$::\n--plain\n");
        fx.post("a.md", "A", 1_000);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        let err = fx.run(&mut plugin, true).unwrap_err();

        assert!(err.to_string().starts_with("No options found for"));
        assert!(plugin.converter.get_requests().is_empty());
        assert!(!fx.site.target_root.join("a.html").exists());
    }

    #[test]
    fn resolution_failure_surfaces_in_dry_run() {
        let fx = Fixture::new();
        fx.post("a.md", "A", 1_000);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        let err = fx.run(&mut plugin, false).unwrap_err();
        assert!(matches!(err, WalkError::Transform(TransformError::Options(_))));
    }

    #[test]
    fn conversion_failure_skips_only_that_post() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("good.md", "Good", 2_000);
        fx.post("bad.md", "Bad", 3_000);
        write_file(&fx.site.target_root, "bad.html", "last good build");

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::failing_on(&["bad.md"]));
        let report = fx.run(&mut plugin, true).unwrap();

        assert_eq!(report.failed, vec![fx.site.source_root.join("bad.md")]);
        assert!(report.removed.is_empty());
        assert_eq!(fx.output("bad.html"), "last good build");
        // Still indexed, against the page already on disk
        assert_eq!(listed(&fx.output("_section_index.html")), vec!["Bad", "Good"]);
        assert_eq!(listed(&fx.output("_recent_index.html")), vec!["Bad", "Good"]);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("posts/a.md", "A", 1_000);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        let report = fx.run(&mut plugin, false).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.files, 1);
        assert!(plugin.converter.get_requests().is_empty());
        assert!(relative_files(&fx.site.target_root).is_empty());
    }

    #[test]
    fn nested_options_and_converter_override_are_inherited() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n--root-opts\n");
        fx.options("special", "pandoc: /opt/pandoc3\n::.*::\n--css=$TARGETROOT/s.css\n");
        fx.post("plain.md", "Plain", 1_000);
        fx.post("special/x.md", "X", 2_000);
        fx.post("special/deeper/y.md", "Y", 3_000);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        let css = format!("--css={}/s.css", fx.site.target_root.display());
        let requests = plugin.converter.get_requests();
        let by_name = |name: &str| {
            requests
                .iter()
                .find(|r| r.source.ends_with(name))
                .unwrap()
                .clone()
        };
        assert_eq!(by_name("plain.md").args, vec!["--root-opts"]);
        assert_eq!(by_name("plain.md").program, None);
        assert_eq!(by_name("x.md").args, vec![css.clone()]);
        assert_eq!(by_name("deeper/y.md").args, vec![css]);
        assert_eq!(by_name("deeper/y.md").program.as_deref(), Some("/opt/pandoc3"));
    }

    #[test]
    fn extra_config_values_are_macros() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n-V author=$AUTHOR\n");
        fx.post("a.md", "A", 1_000);

        let mut config = PressConfig::default();
        config.extra.insert("AUTHOR".into(), "Ann".into());
        let mut plugin = fx.plugin(&config, MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        assert_eq!(plugin.converter.get_requests()[0].args, vec!["-V", "author=Ann"]);
    }

    #[test]
    fn outputs_take_source_timestamps() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("a.md", "A", 1_234_567_890);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        let modified = |p: PathBuf| fs::metadata(p).unwrap().modified().unwrap();
        assert_eq!(
            modified(fx.site.target_root.join("a.html")),
            modified(fx.site.source_root.join("a.md"))
        );
    }

    #[test]
    fn generated_pages_survive_rerun_and_orphans_go() {
        let fx = Fixture::new();
        fx.options("", "::.*::\n");
        fx.post("posts/a.md", "A", 1_000);
        fx.post("posts/b.md", "B", 2_000);

        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        fx.run(&mut plugin, true).unwrap();

        fs::remove_file(fx.site.source_root.join("posts/b.md")).unwrap();
        let mut plugin = fx.plugin(&PressConfig::default(), MockConverter::new());
        let report = fx.run(&mut plugin, true).unwrap();

        assert_eq!(report.removed, vec![fx.site.target_root.join("posts/b.html")]);
        assert!(fx.site.target_root.join("posts/_section_index.html").exists());
        assert!(fx.site.target_root.join("_recent_index.html").exists());
        assert_eq!(listed(&fx.output("posts/_section_index.html")), vec!["A"]);
    }
}
