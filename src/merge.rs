//! Merge export: every configured chapter concatenated into one Markdown file.
//!
//! Meant for proofreading and print: the output starts with a header built
//! from `siteInfo`, followed by each chapter in reading order, separated by a
//! rule and an HTML comment naming the source file:
//!
//! ```text
//! # Summers
//!
//! **A family journal**
//!
//! Author: The Lindqvists
//! …
//! ================================================================================
//!
//!
//! ---
//!
//! <!-- 1 | source: 01-childhood.md -->
//!
//! # Childhood
//! …
//! ```
//!
//! Missing and unreadable files leave a visible marker in place of their
//! content. Files that are not UTF-8 are retried as GBK, which is what older
//! journals written on Chinese-locale Windows machines tend to be.

use crate::config::SiteConfig;
use crate::content::CONTENT_DIR;
use crate::naming;
use chrono::NaiveDateTime;
use encoding_rs::GBK;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Default output filename.
pub const MERGED_FILENAME: &str = "merged_output.md";

const SEPARATOR: &str = "\n\n---\n\n";

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no chapters configured")]
    NoChapters,
}

/// How one listed file fared.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Merged,
    /// Merged after decoding as GBK.
    MergedGbk,
    Missing,
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub merged: usize,
    pub missing: usize,
    pub failed: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.merged + self.missing + self.failed
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub files: Vec<(String, FileOutcome)>,
    pub stats: MergeStats,
}

/// Merge the configured chapters and return the document with its report.
pub fn merge_to_string(
    source_root: &Path,
    config: &SiteConfig,
    generated_at: NaiveDateTime,
) -> Result<(String, MergeReport), MergeError> {
    if config.chapters.is_empty() {
        return Err(MergeError::NoChapters);
    }
    let content_dir = source_root.join(CONTENT_DIR);
    let mut doc = header(config, generated_at);
    let mut report = MergeReport::default();

    for (i, filename) in config.chapters.iter().enumerate() {
        let index = i + 1;
        let outcome = match read_chapter(&content_dir, filename) {
            Ok((text, outcome)) => {
                doc.push_str(SEPARATOR);
                let _ = write!(doc, "<!-- {index} | source: {filename} -->\n\n");
                doc.push_str(text.trim_start_matches('\u{feff}').trim());
                doc.push_str("\n\n");
                report.stats.merged += 1;
                outcome
            }
            Err(FileOutcome::Missing) => {
                doc.push_str(SEPARATOR);
                let _ = write!(doc, "## ⚠️ {filename}\n\n*missing*\n\n");
                report.stats.missing += 1;
                warn!(file = %filename, "missing, left a marker");
                FileOutcome::Missing
            }
            Err(other) => {
                let reason = match &other {
                    FileOutcome::Failed(reason) => reason.clone(),
                    _ => String::from("unknown error"),
                };
                doc.push_str(SEPARATOR);
                let _ = write!(doc, "## ❌ {filename}\n\n*read failed: {reason}*\n\n");
                report.stats.failed += 1;
                warn!(file = %filename, "{reason}");
                other
            }
        };
        debug!(index, file = %filename, ?outcome, "merge");
        report.files.push((filename.clone(), outcome));
    }
    Ok((doc, report))
}

/// Merge into `out_path`.
pub fn merge(
    source_root: &Path,
    config: &SiteConfig,
    out_path: &Path,
    generated_at: NaiveDateTime,
) -> Result<MergeReport, MergeError> {
    let (doc, report) = merge_to_string(source_root, config, generated_at)?;
    if let Some(parent) = out_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_path, doc)?;
    Ok(report)
}

fn header(config: &SiteConfig, generated_at: NaiveDateTime) -> String {
    let site = &config.site_info;
    let or = |value: &str, fallback: &'static str| -> String {
        if value.is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };

    let mut out = String::new();
    let _ = write!(out, "# {}\n\n", or(&site.title, "Untitled"));
    let _ = write!(out, "**{}**\n\n", site.subtitle);
    if let Some(other) = site.other.as_deref().filter(|o| !o.is_empty()) {
        let _ = write!(out, "*{other}*\n\n");
    }
    let _ = write!(out, "Author: {}\n\n", or(&site.author, "Unknown"));
    let _ = write!(out, "Website: {}\n\n", site.url);
    let _ = write!(
        out,
        "Generated: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str(&"=".repeat(80));
    out.push_str("\n\n");
    out
}

/// Read one chapter as text, decoding GBK when it is not UTF-8.
fn read_chapter(content_dir: &Path, filename: &str) -> Result<(String, FileOutcome), FileOutcome> {
    if !naming::is_contained(filename) {
        return Err(FileOutcome::Failed("path leaves the content directory".into()));
    }
    let bytes = match fs::read(content_dir.join(filename)) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(FileOutcome::Missing),
        Err(e) => return Err(FileOutcome::Failed(e.to_string())),
    };
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, FileOutcome::Merged)),
        Err(e) => GBK
            .decode_without_bom_handling_and_without_replacement(e.as_bytes())
            .map(|text| (text.into_owned(), FileOutcome::MergedGbk))
            .ok_or_else(|| FileOutcome::Failed("neither UTF-8 nor GBK".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteInfo;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn when() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    fn setup(files: &[(&str, &[u8])]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let content = tmp.path().join(CONTENT_DIR);
        fs::create_dir_all(&content).unwrap();
        for (name, bytes) in files {
            fs::write(content.join(name), bytes).unwrap();
        }
        tmp
    }

    fn config(chapters: &[&str]) -> SiteConfig {
        SiteConfig {
            chapters: chapters.iter().map(|s| s.to_string()).collect(),
            site_info: SiteInfo {
                title: "Summers".into(),
                subtitle: "A journal".into(),
                author: "Ann".into(),
                url: "https://ex.org".into(),
                other: Some("since 1990".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn header_and_chapters_in_order() {
        let tmp = setup(&[("a.md", "# A\n\nfirst\n".as_bytes()), ("b.md", "\n# B\n".as_bytes())]);
        let (doc, report) = merge_to_string(tmp.path(), &config(&["a.md", "b.md"]), when()).unwrap();

        assert!(doc.starts_with("# Summers\n\n**A journal**\n\n*since 1990*\n\nAuthor: Ann\n\n"));
        assert!(doc.contains("Generated: 2024-03-09 08:30:00\n\n"));
        assert!(doc.contains(&"=".repeat(80)));
        let a = doc.find("<!-- 1 | source: a.md -->\n\n# A\n\nfirst\n\n").unwrap();
        let b = doc.find("<!-- 2 | source: b.md -->\n\n# B\n\n").unwrap();
        assert!(a < b);
        assert_eq!(report.stats, MergeStats { merged: 2, missing: 0, failed: 0 });
    }

    #[test]
    fn missing_file_leaves_marker() {
        let tmp = setup(&[("a.md", "A".as_bytes())]);
        let (doc, report) =
            merge_to_string(tmp.path(), &config(&["gone.md", "a.md"]), when()).unwrap();

        assert!(doc.contains("## ⚠️ gone.md\n\n*missing*"));
        assert!(doc.contains("<!-- 2 | source: a.md -->"));
        assert_eq!(report.stats.missing, 1);
        assert_eq!(report.files[0], ("gone.md".to_string(), FileOutcome::Missing));
    }

    #[test]
    fn gbk_files_are_decoded() {
        let (gbk, _, _) = GBK.encode("夏天的湖");
        let tmp = setup(&[("old.md", gbk.as_ref())]);
        let (doc, report) = merge_to_string(tmp.path(), &config(&["old.md"]), when()).unwrap();
        assert!(doc.contains("夏天的湖"));
        assert_eq!(report.files[0].1, FileOutcome::MergedGbk);
    }

    #[test]
    fn escaping_path_fails() {
        let tmp = setup(&[]);
        let (doc, report) =
            merge_to_string(tmp.path(), &config(&["../config.json"]), when()).unwrap();
        assert!(doc.contains("## ❌ ../config.json"));
        assert_eq!(report.stats.failed, 1);
    }

    #[test]
    fn empty_chapters_is_error() {
        let tmp = setup(&[]);
        assert!(matches!(
            merge_to_string(tmp.path(), &config(&[]), when()),
            Err(MergeError::NoChapters)
        ));
    }

    #[test]
    fn untitled_defaults() {
        let tmp = setup(&[("a.md", "A".as_bytes())]);
        let mut cfg = config(&["a.md"]);
        cfg.site_info = SiteInfo::default();
        let (doc, _) = merge_to_string(tmp.path(), &cfg, when()).unwrap();
        assert!(doc.starts_with("# Untitled\n\n****\n\nAuthor: Unknown\n\n"));
    }

    #[test]
    fn merge_writes_file() {
        let tmp = setup(&[("a.md", "A".as_bytes())]);
        let out = tmp.path().join("export/book.md");
        let report = merge(tmp.path(), &config(&["a.md"]), &out, when()).unwrap();
        assert_eq!(report.stats.total(), 1);
        assert!(fs::read_to_string(out).unwrap().contains("source: a.md"));
    }
}
