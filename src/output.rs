//! CLI output formatting for builds, checks and snapshots.
//!
//! # Information-First Display
//!
//! Every collection is shown by its positional index and title first, with
//! the listing path it produces after an arrow. Details (template, skipped
//! sources, changed files) follow as indented context lines.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Collections
//! 001 Games (2 posts, 1 page) → games.html
//!     Template: gamesTemplate
//! 002 Visual Novels (12 posts, 2 pages) → vn.html
//!     Template: vnTemplate
//!
//! Skipped sources
//!     vn: https://example.org/extra.json
//!
//! Changes
//!     changed: games/data.json
//!
//! Indexed 5 tags, 2 developers
//! Wrote 31 files (full build)
//! ```
//!
//! In an incremental build collections that were not re-rendered show
//! `(unchanged)` instead of a path.
//!
//! ## Snapshot
//!
//! ```text
//! Recorded 4 files
//!     changed: games/data.json
//!     removed: old.json
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::{BuildMode, BuildReport, CollectionSummary};
use crate::snapshot::ChangeSet;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 post`, `2 posts`.
fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, plural)
    }
}

fn collection_lines(index: usize, summary: &CollectionSummary) -> Vec<String> {
    let header = format!(
        "{} {} ({}, {})",
        format_index(index),
        summary.title,
        count(summary.posts, "post", "posts"),
        count(summary.pages, "page", "pages"),
    );
    let header = if summary.rendered {
        format!("{} \u{2192} {}.html", header, summary.key)
    } else {
        format!("{} (unchanged)", header)
    };
    vec![
        header,
        format!("{}Template: {}", indent(1), summary.template),
    ]
}

fn change_lines(changed: &[String], removed: &[String]) -> Vec<String> {
    changed
        .iter()
        .map(|file| format!("{}changed: {}", indent(1), file))
        .chain(
            removed
                .iter()
                .map(|file| format!("{}removed: {}", indent(1), file)),
        )
        .collect()
}

fn report_body(report: &BuildReport) -> Vec<String> {
    let mut lines = vec!["Collections".to_string()];
    for (i, summary) in report.collections.iter().enumerate() {
        lines.extend(collection_lines(i + 1, summary));
    }

    if !report.skipped_sources.is_empty() {
        lines.push(String::new());
        lines.push("Skipped sources".to_string());
        for source in &report.skipped_sources {
            lines.push(format!("{}{}", indent(1), source));
        }
    }

    let changes = change_lines(&report.changed, &report.removed);
    if !changes.is_empty() {
        lines.push(String::new());
        lines.push("Changes".to_string());
        lines.extend(changes);
    }

    lines.push(String::new());
    lines.push(format!(
        "Indexed {}, {}",
        count(report.tags, "tag", "tags"),
        count(report.developers, "developer", "developers"),
    ));
    lines
}

// ============================================================================
// Build
// ============================================================================

/// Format the result of `build`.
pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = report_body(report);
    let mode = match report.mode {
        BuildMode::Full => "full build",
        BuildMode::Incremental => "incremental build",
    };
    lines.push(format!(
        "Wrote {} ({})",
        count(report.written.len(), "file", "files"),
        mode
    ));
    lines
}

/// Print build output to stdout.
pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format the result of `check`: same inventory, nothing written.
pub fn format_check_report(report: &BuildReport) -> Vec<String> {
    let mut lines = report_body(report);
    lines.push(format!(
        "Check passed: {} rendered, nothing written",
        count(report.written.len(), "file", "files")
    ));
    lines
}

/// Print check output to stdout.
pub fn print_check_report(report: &BuildReport) {
    for line in format_check_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Format the result of `snapshot`.
pub fn format_snapshot(changes: &ChangeSet) -> Vec<String> {
    let mut lines = vec![format!(
        "Recorded {}",
        count(changes.current.len(), "file", "files")
    )];
    lines.extend(change_lines(&changes.changed, &changes.removed));
    lines
}

/// Print snapshot output to stdout.
pub fn print_snapshot(changes: &ChangeSet) {
    for line in format_snapshot(changes) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
