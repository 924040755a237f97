//! Shared test utilities for the tree-press test suite.
//!
//! Builders for source trees and template directories, and small readers for
//! what a run left behind.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "src/posts/a.md", "% Hello\n");
//! write_templates(tmp.path());
//!
//! // ... run a walk ...
//!
//! assert_eq!(relative_files(&tmp.path().join("out")), vec!["posts/a.html"]);
//! assert_eq!(listed(&index_html), vec!["Hello"]);
//! ```

use crate::templates::{FEED_TEMPLATE, INDEX_TEMPLATE, SECTION_TEMPLATE};
use std::fs::{self, File, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `content` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
}

/// Set a file's modification time to `secs` after the epoch.
pub fn set_mtime(path: &Path, secs: i64) {
    let time = SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_times(FileTimes::new().set_modified(time))
        .unwrap();
}

/// Write minimal templates into `dir`. Every post renders as one
/// `<li>title</li>` line, readable back with [`listed`].
pub fn write_templates(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join(SECTION_TEMPLATE),
        "<h1>{{ title }}</h1>\n<ul id=\"{{ container_id }}\">\n{% for p in posts %}<li>{{ p.title }}</li>\n{% endfor %}</ul>\n",
    )
    .unwrap();
    fs::write(
        dir.join(INDEX_TEMPLATE),
        "<h1>{{ title }}</h1>\n<ul id=\"{{ container_id }}\">\n{% for p in posts %}<li>{{ p.title }}</li>\n<a href=\"{{ p.link }}\">{{ p.date }}</a>\n<p>{{ p.description }}</p>\n{% endfor %}</ul>\n",
    )
    .unwrap();
    fs::write(
        dir.join(FEED_TEMPLATE),
        "<rss><channel>\n{% for p in posts %}<li>{{ p.title }}</li>\n<pubDate>{{ p.pub_date }}</pubDate>\n{% endfor %}</channel></rss>\n",
    )
    .unwrap();
}

// =========================================================================
// Output readers
// =========================================================================

/// All files under `root`, as sorted `/`-separated relative paths.
pub fn relative_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

/// Post titles listed in a page rendered from [`write_templates`], in order.
pub fn listed(html: &str) -> Vec<String> {
    html.lines()
        .filter_map(|line| line.strip_prefix("<li>")?.strip_suffix("</li>"))
        .map(str::to_string)
        .collect()
}

#[test]
fn listed_reads_titles_in_order() {
    let html = "<h1>x</h1>\n<li>B</li>\n<a>no</a>\n<li>A</li>\n";
    assert_eq!(listed(html), vec!["B", "A"]);
}
