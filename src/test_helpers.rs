//! Shared test utilities.
//!
//! Two kinds of fixture:
//!
//! - [`MemorySource`] + [`config_with`] for content-model tests that never
//!   touch the filesystem.
//! - [`fixture_site`] for anything that builds pages: copies
//!   `fixtures/site/` into a temp directory so tests can mutate it freely.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let source = fixture_site(tmp.path());
//! let report = build(&source, &tmp.path().join("dist"), options()).unwrap();
//! let page = find_page(&report, "01-childhood");
//! ```

use crate::config::SiteConfig;
use crate::content::{ContentItem, ContentModel, ContentSource};
use crate::crypto::CipherParams;
use crate::generate::{BuildOptions, BuildReport, PageOutcome, page_path};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Cheap key derivation so tests that seal pages stay fast.
pub const FAST_CIPHER: CipherParams = CipherParams { iterations: 1_000 };

// =========================================================================
// In-memory content
// =========================================================================

/// Content files held in a map; absent names read as `NotFound`.
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl ContentSource for MemorySource {
    fn read(&self, filename: &str) -> io::Result<String> {
        self.files
            .get(filename)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, filename.to_string()))
    }
}

/// A default config with the three lists filled in.
pub fn config_with(prefaces: &[&str], chapters: &[&str], epilogues: &[&str]) -> SiteConfig {
    let owned = |list: &[&str]| -> Vec<String> { list.iter().map(|s| s.to_string()).collect() };
    SiteConfig {
        prefaces: owned(prefaces),
        chapters: owned(chapters),
        epilogues: owned(epilogues),
        ..Default::default()
    }
}

// =========================================================================
// Fixture site on disk
// =========================================================================

/// Copy `fixtures/site/` to `<root>/site` and return that path.
pub fn fixture_site(root: &Path) -> PathBuf {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    let dst = root.join("site");
    crate::assets::copy_tree(&fixtures, &dst).unwrap();
    dst
}

/// Build options with fast key derivation and a fixed sitemap date.
pub fn options() -> BuildOptions {
    BuildOptions {
        cipher: FAST_CIPHER,
        lastmod: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
        events: None,
    }
}

// =========================================================================
// Lookups, panicking with a clear message on miss
// =========================================================================

/// Find an item by slug. Panics if not found.
pub fn find_item<'a>(model: &'a ContentModel, slug: &str) -> &'a ContentItem {
    model.find(slug).unwrap_or_else(|| {
        let slugs: Vec<&str> = model.items().map(|i| i.slug.as_str()).collect();
        panic!("item '{slug}' not found. Available: {slugs:?}")
    })
}

/// Find a written page by slug. Panics if not found.
pub fn find_page<'a>(report: &'a BuildReport, slug: &str) -> &'a PageOutcome {
    let path = page_path(slug);
    report.pages.iter().find(|p| p.path == path).unwrap_or_else(|| {
        let paths: Vec<&str> = report.pages.iter().map(|p| p.path.as_str()).collect();
        panic!("page '{path}' not written. Written: {paths:?}")
    })
}
