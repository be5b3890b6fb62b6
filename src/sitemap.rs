//! `sitemap.xml` and `robots.txt`.
//!
//! Sitemap URLs must be absolute, so nothing is written without a
//! `siteInfo.url`. A single sitemap holds at most [`URL_LIMIT`] entries;
//! beyond that the URLs are split across `sitemap-1.xml`, `sitemap-2.xml`, …
//! and `sitemap-index.xml` points at the parts. Sitemap files left by a
//! previous build are removed first, so the two layouts never coexist.

use crate::config::SiteInfo;
use crate::content::ContentModel;
use crate::types::chapter_href;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Maximum URLs in one sitemap file, per the sitemaps.org protocol.
pub const URL_LIMIT: usize = 50_000;
pub const SITEMAP_FILE: &str = "sitemap.xml";
pub const SITEMAP_INDEX_FILE: &str = "sitemap-index.xml";
pub const ROBOTS_FILE: &str = "robots.txt";

const XMLNS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeoReport {
    /// Sitemap filenames, index last when split. Empty without a site URL.
    pub sitemaps: Vec<String>,
    pub url_count: usize,
}

impl SeoReport {
    /// The file robots.txt points at.
    pub fn entry_point(&self) -> Option<&str> {
        self.sitemaps.last().map(String::as_str)
    }
}

/// Absolute URLs for the home page and every item, in reading order.
pub fn page_urls(site: &SiteInfo, model: &ContentModel) -> Vec<String> {
    let base = site.base_url();
    std::iter::once(format!("{base}/"))
        .chain(model.items().map(|item| format!("{base}{}", chapter_href(&item.slug))))
        .collect()
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write one `<urlset>` document.
pub fn write_sitemap<W: Write>(mut w: W, urls: &[String], lastmod: NaiveDate) -> io::Result<()> {
    let date = lastmod.format("%Y-%m-%d");
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<urlset xmlns="{XMLNS}">"#)?;
    for url in urls {
        writeln!(
            w,
            "  <url><loc>{}</loc><lastmod>{date}</lastmod></url>",
            xml_escape(url)
        )?;
    }
    writeln!(w, "</urlset>")?;
    w.flush()
}

/// Write a `<sitemapindex>` document pointing at `locations`.
pub fn write_sitemap_index<W: Write>(
    mut w: W,
    locations: &[String],
    lastmod: NaiveDate,
) -> io::Result<()> {
    let date = lastmod.format("%Y-%m-%d");
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<sitemapindex xmlns="{XMLNS}">"#)?;
    for loc in locations {
        writeln!(
            w,
            "  <sitemap><loc>{}</loc><lastmod>{date}</lastmod></sitemap>",
            xml_escape(loc)
        )?;
    }
    writeln!(w, "</sitemapindex>")?;
    w.flush()
}

/// `robots.txt` allowing everything, pointing at `sitemap` when given.
pub fn robots_txt(sitemap: Option<&str>) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\n");
    if let Some(url) = sitemap {
        out.push_str(&format!("\nSitemap: {url}\n"));
    }
    out
}

/// True for `sitemap.xml`, `sitemap-index.xml` and `sitemap-<N>.xml`.
fn is_sitemap_file(name: &str) -> bool {
    if name == SITEMAP_FILE || name == SITEMAP_INDEX_FILE {
        return true;
    }
    name.strip_prefix("sitemap-")
        .and_then(|rest| rest.strip_suffix(".xml"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Delete sitemap files written by an earlier build.
pub fn remove_sitemaps(output_dir: &Path) -> Result<(), SitemapError> {
    let entries = match fs::read_dir(output_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_str().is_some_and(is_sitemap_file) && entry.file_type()?.is_file() {
            debug!(file = ?name, "removing stale sitemap");
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Write sitemap(s) for `urls`, splitting above `limit`.
/// Returns the filenames written, index last.
pub fn write_sitemaps(
    output_dir: &Path,
    base_url: &str,
    urls: &[String],
    lastmod: NaiveDate,
    limit: usize,
) -> Result<Vec<String>, SitemapError> {
    fs::create_dir_all(output_dir)?;
    remove_sitemaps(output_dir)?;
    if urls.len() <= limit {
        let file = File::create(output_dir.join(SITEMAP_FILE))?;
        write_sitemap(BufWriter::new(file), urls, lastmod)?;
        return Ok(vec![SITEMAP_FILE.to_string()]);
    }

    let mut names = Vec::new();
    for (i, part) in urls.chunks(limit.max(1)).enumerate() {
        let name = format!("sitemap-{}.xml", i + 1);
        let file = File::create(output_dir.join(&name))?;
        write_sitemap(BufWriter::new(file), part, lastmod)?;
        names.push(name);
    }
    let locations: Vec<String> = names.iter().map(|n| format!("{base_url}/{n}")).collect();
    let file = File::create(output_dir.join(SITEMAP_INDEX_FILE))?;
    write_sitemap_index(BufWriter::new(file), &locations, lastmod)?;
    names.push(SITEMAP_INDEX_FILE.to_string());
    Ok(names)
}

/// Write sitemap(s) and robots.txt for a built site.
pub fn write_seo_files(
    output_dir: &Path,
    site: &SiteInfo,
    model: &ContentModel,
    lastmod: NaiveDate,
) -> Result<SeoReport, SitemapError> {
    write_seo_files_with_limit(output_dir, site, model, lastmod, URL_LIMIT)
}

pub fn write_seo_files_with_limit(
    output_dir: &Path,
    site: &SiteInfo,
    model: &ContentModel,
    lastmod: NaiveDate,
    limit: usize,
) -> Result<SeoReport, SitemapError> {
    let base = site.base_url();
    let mut report = SeoReport::default();

    if base.is_empty() {
        warn!("siteInfo.url is empty; skipping sitemap");
        remove_sitemaps(output_dir)?;
    } else {
        let urls = page_urls(site, model);
        report.url_count = urls.len();
        report.sitemaps = write_sitemaps(output_dir, base, &urls, lastmod, limit)?;
    }

    let sitemap_url = report.entry_point().map(|name| format!("{base}/{name}"));
    fs::create_dir_all(output_dir)?;
    fs::write(output_dir.join(ROBOTS_FILE), robots_txt(sitemap_url.as_deref()))?;
    Ok(report)
}
