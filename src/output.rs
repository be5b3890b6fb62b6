//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every content item is shown by its reading position and title, with the
//! source filename or output path as indented context. Positions are 1-based
//! and zero-padded, so the listing reads like a table of contents.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Prefaces
//! 001 Foreword
//!     Source: foreword.md
//!
//! Chapters
//! 002 Childhood
//!     Source: 01-childhood.md
//! 003 The Lake House [protected]
//!     Source: 02-the-lake-house.md
//!
//! Skipped
//!     missing.md: file not found
//!
//! Templates
//!     built-in
//! ```
//!
//! ## Build
//!
//! ```text
//! Home → index.html
//! 001 Foreword → chapter/foreword/index.html
//! 003 The Lake House → chapter/02-the-lake-house/index.html [encrypted]
//!
//! Generated 4 pages (1 encrypted), skipped 1
//! Static: 12 files in 3 directories (48213 bytes)
//! Sitemap: sitemap.xml (5 URLs)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::content::ContentItem;
use crate::generate::{BuildEvent, BuildReport, INDEX_FILE, Plan};
use crate::merge::{FileOutcome, MergeReport};
use crate::types::ContentKind;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Header line for a content item: reading position and title.
///
/// ```text
/// 002 Childhood
/// 003 The Lake House [protected]
/// ```
fn item_header(global_index: usize, title: &str, protected: bool) -> String {
    let mut line = format!("{} {}", format_index(global_index + 1), title);
    if protected {
        line.push_str(" [protected]");
    }
    line
}

fn section_heading(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Preface => "Prefaces",
        ContentKind::Chapter => "Chapters",
        ContentKind::Epilogue => "Epilogues",
    }
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

// ============================================================================
// Check
// ============================================================================

fn item_lines(item: &ContentItem) -> Vec<String> {
    let mut lines = vec![item_header(item.global_index, item.title(), item.is_encrypted())];
    lines.push(format!("{}Source: {}", indent(1), item.source));
    if let Some(category) = item.category() {
        lines.push(format!("{}Category: {}", indent(1), category));
    }
    lines
}

/// Format the content inventory of a loaded plan.
pub fn format_check_output(plan: &Plan, source_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let model = &plan.model;

    for kind in [ContentKind::Preface, ContentKind::Chapter, ContentKind::Epilogue] {
        let items = model.section(kind);
        if items.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(section_heading(kind).to_string());
        for item in items {
            lines.extend(item_lines(item));
        }
    }

    if !model.warnings().is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for warning in model.warnings() {
            lines.push(format!(
                "{}{}: {}",
                indent(1),
                warning.filename,
                warning.reason
            ));
        }
    }

    lines.push(String::new());
    lines.push("Templates".to_string());
    match &plan.templates.origin {
        Some(dir) => {
            let shown = dir.strip_prefix(source_root).unwrap_or(dir);
            lines.push(format!("{}{}/", indent(1), shown.display()));
        }
        None => lines.push(format!("{}built-in", indent(1))),
    }
    lines
}

pub fn print_check_output(plan: &Plan, source_root: &Path) {
    for line in format_check_output(plan, source_root) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format a single page event as display lines.
pub fn format_build_event(event: &BuildEvent) -> Vec<String> {
    match event {
        BuildEvent::PageWritten(page) => {
            let mut line = format!(
                "{} {} \u{2192} {}",
                format_index(page.global_index + 1),
                page.title,
                page.path
            );
            if page.encrypted {
                line.push_str(" [encrypted]");
            }
            let mut lines = vec![line];
            if let Some(note) = &page.diagnostic {
                lines.push(format!("{}{}", indent(1), note));
            }
            lines
        }
        BuildEvent::PageFailed(failure) => vec![
            format!(
                "{} {} \u{2717} not written",
                format_index(failure.global_index + 1),
                failure.title
            ),
            format!("{}{}", indent(1), failure.error),
        ],
    }
}

/// Format the end-of-build summary.
pub fn format_build_summary(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!("Home \u{2192} {INDEX_FILE}")];
    if let Some(note) = &report.home_diagnostic {
        lines.push(format!("{}{}", indent(1), note));
    }
    lines.push(String::new());

    let mut summary = format!(
        "Generated {} ({} encrypted)",
        plural(report.pages.len(), "page", "pages"),
        report.encrypted_count()
    );
    if !report.warnings.is_empty() {
        summary.push_str(&format!(", skipped {}", report.warnings.len()));
    }
    if !report.failures.is_empty() {
        summary.push_str(&format!(", failed {}", report.failures.len()));
    }
    lines.push(summary);

    for warning in &report.warnings {
        lines.push(format!("{}{}: {}", indent(1), warning.filename, warning.reason));
    }
    for note in &report.asset_diagnostics {
        lines.push(format!("{}{}", indent(1), note));
    }
    if report.static_files.files > 0 {
        lines.push(format!("Static: {}", report.static_files));
    }
    match report.seo.entry_point() {
        Some(entry) => lines.push(format!(
            "Sitemap: {} ({})",
            entry,
            plural(report.seo.url_count, "URL", "URLs")
        )),
        None => lines.push("Sitemap: skipped (no siteInfo.url)".to_string()),
    }
    if let Some(dir) = &report.custom_templates {
        lines.push(format!("Templates: {}", dir.display()));
    }
    lines
}

pub fn print_build_summary(report: &BuildReport) {
    for line in format_build_summary(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Merge
// ============================================================================

pub fn format_merge_output(report: &MergeReport, out_path: &Path) -> Vec<String> {
    let total = report.files.len();
    let mut lines = Vec::with_capacity(total + 3);
    for (i, (filename, outcome)) in report.files.iter().enumerate() {
        let status = match outcome {
            FileOutcome::Merged => "merged".to_string(),
            FileOutcome::MergedGbk => "merged (GBK)".to_string(),
            FileOutcome::Missing => "missing".to_string(),
            FileOutcome::Failed(reason) => format!("failed: {reason}"),
        };
        lines.push(format!("[{}/{}] {}: {}", i + 1, total, filename, status));
    }
    let stats = report.stats;
    lines.push(String::new());
    lines.push(format!(
        "Merged {} of {} ({} missing, {} failed) \u{2192} {}",
        stats.merged,
        stats.total(),
        stats.missing,
        stats.failed,
        out_path.display()
    ));
    lines
}

pub fn print_merge_output(report: &MergeReport, out_path: &Path) {
    for line in format_merge_output(report, out_path) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
