//! Site generation.
//!
//! Turns a source directory into a finished site:
//!
//! ```text
//! <source>/                         <output>/
//! ├── config.json                   ├── index.html
//! ├── content/                      ├── chapter/
//! │   ├── foreword.md         →     │   ├── foreword/index.html
//! │   └── 01-childhood.md           │   └── 01-childhood/index.html
//! ├── templates/ (optional)         ├── assets/
//! │   ├── home.html                 │   ├── style.css
//! │   └── chapter.html              │   └── reader.js
//! └── static/                       ├── static/…        (copied as is)
//!     └── photos/…                  ├── sitemap.xml
//!                                   └── robots.txt
//! ```
//!
//! ## Stages
//!
//! 1. [`Plan::load`]: config, templates and the content model. Any failure
//!    here aborts the build before the output directory is touched.
//! 2. Pages: the home page, then every item rendered, sealed when it has a
//!    password, minified and written. Items run in parallel on the rayon
//!    pool; a failing page is reported and skipped.
//! 3. Assets, `static/` copy, sitemap and robots.
//!
//! The `chapter/` tree is deleted before pages are written so pages for
//! removed content do not survive a rebuild.
//!
//! Progress is reported as [`BuildEvent`]s over an optional channel, the
//! same way the CLI printer thread consumes them.

use crate::assets::{self, AssetError, CopyStats};
use crate::config::{self, ConfigError, SiteConfig};
use crate::content::{BuildWarning, ContentItem, ContentModel};
use crate::crypto::{self, CipherParams, DecryptError, EncryptError, PageBody};
use crate::minify::{AssetKind, minify_if};
use crate::render;
use crate::sitemap::{self, SeoReport, SitemapError};
use crate::template::{TemplateError, TemplateSet};
use crate::types::PageData;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CHAPTER_DIR: &str = "chapter";
pub const ASSETS_DIR: &str = "assets";
pub const INDEX_FILE: &str = "index.html";

const STYLE_CSS: &str = include_str!("../static/style.css");
const READER_JS: &str = include_str!("../static/reader.js");

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("asset copy failed: {0}")]
    Assets(#[from] AssetError),
    #[error("sitemap failed: {0}")]
    Sitemap(#[from] SitemapError),
    #[error("{0} has no encrypted content")]
    NotEncrypted(PathBuf),
    #[error("encryption failed: {0}")]
    Encrypt(#[from] EncryptError),
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

/// Everything loaded before any output is written.
#[derive(Debug)]
pub struct Plan {
    pub config: SiteConfig,
    pub templates: TemplateSet,
    pub model: ContentModel,
}

impl Plan {
    pub fn load(source: &Path) -> Result<Self, GenerateError> {
        let config = config::load_config(source)?;
        Self::with_config(source, config)
    }

    pub fn with_config(source: &Path, config: SiteConfig) -> Result<Self, GenerateError> {
        let templates = TemplateSet::load(source)?;
        let model = ContentModel::load(source, &config);
        Ok(Self {
            config,
            templates,
            model,
        })
    }
}

/// A page that made it to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub global_index: usize,
    pub title: String,
    /// Output path relative to the output directory.
    pub path: String,
    pub encrypted: bool,
    /// Set when minification fell back to the unminified page.
    pub diagnostic: Option<String>,
}

/// A page that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFailure {
    pub global_index: usize,
    pub title: String,
    pub error: String,
}

/// Progress events emitted while pages are written.
#[derive(Debug, Clone)]
pub enum BuildEvent {
    PageWritten(PageOutcome),
    PageFailed(PageFailure),
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub cipher: CipherParams,
    /// Date stamped into the sitemap.
    pub lastmod: NaiveDate,
    pub events: Option<Sender<BuildEvent>>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cipher: CipherParams::default(),
            lastmod: chrono::Local::now().date_naive(),
            events: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Set when the home page was written unminified.
    pub home_diagnostic: Option<String>,
    /// Written pages in reading order.
    pub pages: Vec<PageOutcome>,
    pub failures: Vec<PageFailure>,
    pub warnings: Vec<BuildWarning>,
    /// Minification fallbacks for the bundled assets.
    pub asset_diagnostics: Vec<String>,
    pub static_files: CopyStats,
    pub seo: SeoReport,
    pub custom_templates: Option<PathBuf>,
}

impl BuildReport {
    pub fn encrypted_count(&self) -> usize {
        self.pages.iter().filter(|p| p.encrypted).count()
    }
}

/// Load `<source>/config.json` and build the site into `output`.
pub fn build(source: &Path, output: &Path, options: BuildOptions) -> Result<BuildReport, GenerateError> {
    let plan = Plan::load(source)?;
    emit(&plan, source, output, options)
}

/// Write a loaded plan to `output`.
pub fn emit(
    plan: &Plan,
    source: &Path,
    output: &Path,
    options: BuildOptions,
) -> Result<BuildReport, GenerateError> {
    let config = &plan.config;
    let site = &config.site_info;
    let model = &plan.model;
    let minify = config.minification;

    fs::create_dir_all(output)?;
    let chapter_root = output.join(CHAPTER_DIR);
    if chapter_root.exists() {
        fs::remove_dir_all(&chapter_root)?;
    }

    let home_data = PageData {
        site: site.clone(),
        navigation: model.navigation(),
        current_index: None,
    }
    .to_script_json()?;
    let home_html = render::render_home(&plan.templates.home, model, site, &home_data);
    let home = minify_if(minify, AssetKind::Html, home_html);
    fs::write(output.join(INDEX_FILE), &home.output)?;
    if let Some(note) = &home.diagnostic {
        warn!("{INDEX_FILE}: {note}");
    }

    let cipher = options.cipher;
    let items: Vec<&ContentItem> = model.items().collect();
    let results: Vec<Result<PageOutcome, PageFailure>> = items
        .par_iter()
        .map_with(options.events.clone(), |events, item| {
            let result = write_page(plan, item, output, cipher).map_err(|e| PageFailure {
                global_index: item.global_index,
                title: item.title().to_string(),
                error: e.to_string(),
            });
            match &result {
                Ok(page) => {
                    debug!(path = %page.path, encrypted = page.encrypted, "page written");
                    if let Some(tx) = events {
                        tx.send(BuildEvent::PageWritten(page.clone())).ok();
                    }
                }
                Err(failure) => {
                    warn!(slug = %item.slug, "page skipped: {}", failure.error);
                    if let Some(tx) = events {
                        tx.send(BuildEvent::PageFailed(failure.clone())).ok();
                    }
                }
            }
            result
        })
        .collect();

    let mut report = BuildReport {
        home_diagnostic: home.diagnostic,
        warnings: model.warnings().to_vec(),
        custom_templates: plan.templates.origin.clone(),
        ..Default::default()
    };
    for result in results {
        match result {
            Ok(page) => report.pages.push(page),
            Err(failure) => report.failures.push(failure),
        }
    }

    report.asset_diagnostics = write_bundled_assets(output, minify)?;
    report.static_files = assets::copy_static(source, output)?;
    report.seo = sitemap::write_seo_files(output, site, model, options.lastmod)?;

    info!(
        pages = report.pages.len(),
        failed = report.failures.len(),
        skipped = report.warnings.len(),
        "site written to {}",
        output.display()
    );
    Ok(report)
}

/// Output path of an item's page, relative to the output directory.
pub fn page_path(slug: &str) -> String {
    format!("{CHAPTER_DIR}/{slug}/{INDEX_FILE}")
}

fn write_page(
    plan: &Plan,
    item: &ContentItem,
    output: &Path,
    cipher: CipherParams,
) -> Result<PageOutcome, GenerateError> {
    let site = &plan.config.site_info;
    let data = PageData {
        site: site.clone(),
        navigation: plan.model.navigation(),
        current_index: Some(item.global_index),
    }
    .to_script_json()?;

    let body = PageBody::seal(item.body_html.clone(), item.password(), cipher)?;
    let html = render::render_chapter(&plan.templates.chapter, item, &body, &plan.model, site, &data);
    let page = minify_if(plan.config.minification, AssetKind::Html, html);

    let relative = page_path(&item.slug);
    let target = output.join(&relative);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, &page.output)?;

    Ok(PageOutcome {
        global_index: item.global_index,
        title: item.title().to_string(),
        path: relative,
        encrypted: body.is_encrypted(),
        diagnostic: page.diagnostic,
    })
}

/// Write `assets/style.css` and `assets/reader.js`. Returns minify fallbacks.
fn write_bundled_assets(output: &Path, minify: bool) -> Result<Vec<String>, GenerateError> {
    let dir = output.join(ASSETS_DIR);
    fs::create_dir_all(&dir)?;
    let mut diagnostics = Vec::new();
    for (name, kind, text) in [
        ("style.css", AssetKind::Css, STYLE_CSS),
        ("reader.js", AssetKind::Js, READER_JS),
    ] {
        let min = minify_if(minify, kind, text.to_string());
        fs::write(dir.join(name), &min.output)?;
        if let Some(note) = min.diagnostic {
            warn!("{name}: {note}");
            diagnostics.push(format!("{name}: {note}"));
        }
    }
    Ok(diagnostics)
}

/// Decrypt a generated page with `password`.
///
/// `page` is a path to an HTML file, or a slug looked up under
/// `<output>/chapter/`.
pub fn decrypt_page(output: &Path, page: &str, password: &str) -> Result<String, GenerateError> {
    let direct = PathBuf::from(page);
    let path = if direct.is_file() {
        direct
    } else {
        output.join(page_path(page))
    };
    let html = fs::read_to_string(&path)?;
    let payload = render::extract_payload(&html).ok_or(GenerateError::NotEncrypted(path))?;
    Ok(crypto::decrypt(&payload, password)?)
}
