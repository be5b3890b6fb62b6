//! Site configuration module.
//!
//! The whole book is described by one `config.json` at the source root:
//!
//! ```json
//! {
//!   "prefaces": ["foreword.md"],
//!   "chapters": ["01-childhood.md", "02-the-lake-house.md"],
//!   "epilogues": ["afterword.md"],
//!   "siteInfo": {
//!     "title": "Summers",
//!     "subtitle": "A family journal",
//!     "author": "The Lindqvists",
//!     "description": "Thirty years of summers at the lake.",
//!     "keywords": "journal, family, memoir",
//!     "url": "https://summers.example.org",
//!     "email": "hello@summers.example.org"
//!   },
//!   "minification": true,
//!   "processing": { "maxProcesses": 4 }
//! }
//! ```
//!
//! The three lists are the reading order. Every key is optional; missing lists
//! are empty and missing `siteInfo` fields are empty strings. Unknown keys are
//! ignored so configs shared with other tooling keep loading.
//!
//! A config that is missing, unparsable, or fails [`SiteConfig::validate`]
//! aborts the build: nothing downstream is trustworthy without it.

use crate::types::ContentKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config filename inside the source directory.
pub const CONFIG_FILENAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Front matter of the book, read before the chapters.
    pub prefaces: Vec<String>,
    /// Main chapters in reading order.
    pub chapters: Vec<String>,
    /// Back matter, read after the chapters.
    pub epilogues: Vec<String>,
    /// Site-wide metadata shown in page headers and SEO tags.
    pub site_info: SiteInfo,
    /// Minify generated HTML, CSS and JS.
    pub minification: bool,
    /// Parallel page rendering settings.
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            prefaces: Vec::new(),
            chapters: Vec::new(),
            epilogues: Vec::new(),
            site_info: SiteInfo::default(),
            minification: true,
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.site_info.url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "siteInfo.url must be an absolute http(s) URL, got {url:?}"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.maxProcesses must be at least 1".into(),
            ));
        }
        for (kind, files) in self.sections() {
            if let Some(blank) = files.iter().position(|f| f.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "{}[{blank}] is an empty filename",
                    kind.section_name()
                )));
            }
        }
        Ok(())
    }

    /// The three content lists in reading order, tagged with their kind.
    pub fn sections(&self) -> [(ContentKind, &[String]); 3] {
        [
            (ContentKind::Preface, self.prefaces.as_slice()),
            (ContentKind::Chapter, self.chapters.as_slice()),
            (ContentKind::Epilogue, self.epilogues.as_slice()),
        ]
    }

    /// Total number of configured filenames across all lists.
    pub fn listed_count(&self) -> usize {
        self.prefaces.len() + self.chapters.len() + self.epilogues.len()
    }
}

/// Site-wide metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteInfo {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub description: String,
    pub keywords: String,
    /// Public base URL, used for canonical links and the sitemap.
    pub url: String,
    pub email: String,
    /// Free-form extra line shown under the subtitle in exports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other: Option<String>,
}

impl SiteInfo {
    /// Base URL without a trailing slash; empty if unset.
    pub fn base_url(&self) -> &str {
        self.url.trim().trim_end_matches('/')
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessingConfig {
    /// Maximum number of parallel page workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate config JSON.
pub fn parse_config(json: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load `config.json` from the given source directory.
pub fn load_config(source: &Path) -> Result<SiteConfig, ConfigError> {
    load_config_file(&source.join(CONFIG_FILENAME))
}

/// Load a config file from an explicit path.
pub fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a complete stock `config.json`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_json() -> &'static str {
    r#"{
  "prefaces": ["foreword.md"],
  "chapters": ["01-first-chapter.md", "02-second-chapter.md"],
  "epilogues": ["afterword.md"],
  "siteInfo": {
    "title": "My Memory Book",
    "subtitle": "Stories worth keeping",
    "author": "Your Name",
    "description": "A collection of memories.",
    "keywords": "memoir, journal",
    "url": "https://example.org",
    "email": "you@example.org"
  },
  "minification": true,
  "processing": {
    "maxProcesses": null
  }
}
"#
}
