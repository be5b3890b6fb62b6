//! Slugs and display titles derived from content filenames.
//!
//! Content files are listed by filename in `config.json`, and the filename is
//! the only identity a page has. The slug becomes the permanent URL segment
//! (`chapter/<slug>/`), so it must be stable across builds and safe in a path
//! and a URL.
//!
//! ## Rules
//!
//! - The `.md` / `.markdown` extension is dropped.
//! - Whitespace runs become a single `-`.
//! - Characters that are unsafe in a URL path segment (`/ \ ? # % " < > | ' &`
//!   and control characters) are removed.
//! - Case and non-ASCII letters are preserved: `01-夏天.md` → `01-夏天`.
//!
//! An optional `NNN-` ordering prefix is kept in the slug (it is part of the
//! filename) but dropped from the display title:
//! - `03-lake-house.md` → slug `03-lake-house`, title "lake house"
//! - `afterword.md` → slug `afterword`, title "afterword"

use std::path::{Component, Path};

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Result of parsing a content filename like `03-lake-house.md`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedName {
    /// Number prefix if present (e.g., `3` from `03-lake-house.md`)
    pub number: Option<u32>,
    /// URL-safe slug, number prefix preserved
    pub slug: String,
    /// Display title: name after the prefix with dashes converted to spaces.
    pub display_title: String,
}

/// Parse a configured content filename.
///
/// Returns `None` if nothing usable is left after sanitizing (e.g. `"?.md"`),
/// or if the slug is only dots (`"...md"` → `..`), which would name a
/// directory above `chapter/`.
/// Only the last path component counts: `part-one/03-lake.md` → `03-lake`.
pub fn parse_filename(filename: &str) -> Option<ParsedName> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    let stem = strip_markdown_extension(base);
    let slug = slugify(stem);
    if slug.chars().all(|c| c == '.') {
        return None;
    }

    let (number, name) = match slug.split_once('-') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) => {
            (prefix.parse::<u32>().ok(), rest)
        }
        _ => (None, slug.as_str()),
    };
    let display_title = if name.is_empty() {
        slug.clone()
    } else {
        name.replace('-', " ")
    };

    Some(ParsedName {
        number,
        slug,
        display_title,
    })
}

fn strip_markdown_extension(filename: &str) -> &str {
    if let Some((stem, ext)) = filename.rsplit_once('.')
        && MARKDOWN_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    {
        return stem;
    }
    filename
}

/// Turn a filename stem into a URL path segment.
pub fn slugify(stem: &str) -> String {
    let mut slug = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.trim().chars() {
        if c.is_whitespace() {
            pending_dash = true;
            continue;
        }
        if c.is_control() || matches!(c, '/' | '\\' | '?' | '#' | '%' | '"' | '<' | '>' | '|' | '\'' | '&') {
            continue;
        }
        if pending_dash && !slug.is_empty() {
            slug.push('-');
        }
        pending_dash = false;
        slug.push(c);
    }
    slug
}

/// True if a configured filename stays inside the content directory.
///
/// Rejects absolute paths and any `..` component. Subdirectories are fine.
pub fn is_contained(filename: &str) -> bool {
    let path = Path::new(filename);
    !filename.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
