//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns display lines, so tests can
//! check exact output; the `print_*` wrappers write them to stdout.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Dry run: nothing was written (use --execute)
//! Walked 4 directories, 12 files
//! Failed (1)
//!     posts/broken.md
//! Would remove (2)
//!     posts/old.html
//!     posts/older.html
//! ```
//!
//! Failed files are shown relative to the source root, removals relative to
//! the target root. Empty sections are omitted.
//!
//! ## Plugins
//!
//! ```text
//! publish-html  Convert markdown posts to HTML and ...
//! copy          Mirror matching files unchanged, ...
//! ```

use crate::plugins::PluginKind;
use crate::walk::WalkReport;
use std::path::Path;

/// Path relative to `root` when it lies under it, otherwise as given.
fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

pub fn format_walk_report(report: &WalkReport, source_root: &Path, target_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    if report.dry_run {
        lines.push("Dry run: nothing was written (use --execute)".to_string());
    }
    lines.push(format!(
        "Walked {}, {}",
        plural(report.directories, "directory", "directories"),
        plural(report.files, "file", "files")
    ));

    if !report.failed.is_empty() {
        lines.push(format!("Failed ({})", report.failed.len()));
        for path in &report.failed {
            lines.push(format!("    {}", relative_display(path, source_root)));
        }
    }

    if !report.removed.is_empty() {
        let heading = if report.dry_run { "Would remove" } else { "Removed" };
        lines.push(format!("{} ({})", heading, report.removed.len()));
        for path in &report.removed {
            lines.push(format!("    {}", relative_display(path, target_root)));
        }
    }
    lines
}

pub fn print_walk_report(report: &WalkReport, source_root: &Path, target_root: &Path) {
    for line in format_walk_report(report, source_root, target_root) {
        println!("{}", line);
    }
}

pub fn format_plugin_list() -> Vec<String> {
    let width = PluginKind::ALL
        .iter()
        .map(|k| k.name().len())
        .max()
        .unwrap_or(0);
    PluginKind::ALL
        .iter()
        .map(|k| format!("{:width$}  {}", k.name(), k.description()))
        .collect()
}

pub fn print_plugin_list() {
    for line in format_plugin_list() {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
