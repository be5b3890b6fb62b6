//! HTML fragments and page assembly.
//!
//! Everything generated from content or config values is built with maud,
//! so titles, categories and site fields are escaped on the way in. The
//! finished fragments are then dropped into the page templates as
//! placeholder values.
//!
//! The encrypted container is the contract with `static/reader.js`:
//!
//! ```html
//! <div id="encrypted-content" hidden
//!      data-encrypted="…" data-iv="…" data-salt="…" data-iterations="333333"></div>
//! ```
//!
//! [`extract_payload`] reads the same markup back.

use crate::config::SiteInfo;
use crate::content::{ContentItem, ContentModel};
use crate::crypto::{self, EncryptedPayload, PageBody};
use crate::markdown::normalize_image_src;
use crate::template::{Placeholder, Template, Values};
use crate::types::{ContentKind, NavigationEntry, chapter_href};
use maud::{Markup, PreEscaped, html};
use regex::Regex;
use std::sync::LazyLock;

static CONTAINER_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<div\b[^>]*\bid="encrypted-content"[^>]*>"#).expect("static regex")
});
static DATA_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdata-(encrypted|iv|salt|iterations)="([^"]*)""#).expect("static regex")
});

/// Escape text for HTML content or a double-quoted attribute.
fn escape(text: &str) -> String {
    html! { (text) }.into_string()
}

fn section_label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Preface => "Preface",
        ContentKind::Chapter => "Chapters",
        ContentKind::Epilogue => "Epilogue",
    }
}

/// Absolute URL when the site URL is known, site-relative otherwise.
pub fn canonical_url(site: &SiteInfo, path: &str) -> String {
    format!("{}{path}", site.base_url())
}

// ============================================================================
// Fragments
// ============================================================================

/// Title block at the top of a chapter page. Stays visible when the body
/// is encrypted.
pub fn article_header(item: &ContentItem) -> Markup {
    let tags = item.tags();
    html! {
        header.entry-header {
            @if let Some(category) = item.category() {
                p.entry-category { (category) }
            }
            h1.entry-title { (item.title()) }
            @if let Some(subtitle) = item.subtitle() {
                p.entry-subtitle { (subtitle) }
            }
            @if !tags.is_empty() {
                ul.entry-tags {
                    @for tag in &tags {
                        li { (tag) }
                    }
                }
            }
        }
    }
}

pub fn illustration(item: &ContentItem) -> Markup {
    html! {
        @if let Some(src) = item.illustration() {
            figure.entry-illustration {
                img src=(normalize_image_src(src)) alt=(item.title());
            }
        }
    }
}

/// Password prompt plus the hidden ciphertext container.
pub fn encrypted_shell(payload: &EncryptedPayload) -> Markup {
    html! {
        section.protected {
            form.password-form id="password-form" {
                p { "This page is protected." }
                label for="page-password" { "Password" }
                input id="page-password" type="password" autocomplete="current-password" required;
                button type="submit" { "Unlock" }
                p.password-error id="password-error" role="alert" hidden { "Incorrect password" }
            }
            div id="encrypted-content" hidden
                data-encrypted=(payload.ciphertext)
                data-iv=(payload.iv)
                data-salt=(payload.salt)
                data-iterations=(payload.iterations) {}
        }
    }
}

/// Table of contents grouped by section, current entry marked.
pub fn toc(navigation: &[NavigationEntry], current: Option<usize>) -> Markup {
    let sections = [ContentKind::Preface, ContentKind::Chapter, ContentKind::Epilogue];
    html! {
        @for kind in sections {
            @let entries: Vec<&NavigationEntry> =
                navigation.iter().filter(|e| e.kind == kind).collect();
            @if !entries.is_empty() {
                section.toc-section data-section=(kind.section_name()) {
                    h2 { (section_label(kind)) }
                    ol {
                        @for entry in entries {
                            @let is_current = current == Some(entry.global_index);
                            li class=[is_current.then_some("current")] {
                                a href=(entry.href()) {
                                    (entry.title)
                                    @if entry.is_encrypted {
                                        span.lock aria-label="protected" { " \u{1F512}" }
                                    }
                                }
                                @if let Some(subtitle) = &entry.subtitle {
                                    span.toc-subtitle { (subtitle) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn prev_link(item: Option<&ContentItem>) -> Markup {
    html! {
        @if let Some(item) = item {
            a.pager-prev href=(chapter_href(&item.slug)) rel="prev" { "← " (item.title()) }
        }
    }
}

pub fn next_link(item: Option<&ContentItem>) -> Markup {
    html! {
        @if let Some(item) = item {
            a.pager-next href=(chapter_href(&item.slug)) rel="next" { (item.title()) " →" }
        }
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Placeholder values shared by every page.
pub fn site_values(site: &SiteInfo, book_data: &str) -> Values {
    let mut values = Values::new();
    values
        .set(Placeholder::SiteTitle, escape(&site.title))
        .set(Placeholder::SiteSubtitle, escape(&site.subtitle))
        .set(Placeholder::SiteAuthor, escape(&site.author))
        .set(Placeholder::SiteDescription, escape(&site.description))
        .set(Placeholder::SiteKeywords, escape(&site.keywords))
        .set(Placeholder::SiteUrl, escape(site.base_url()))
        .set(Placeholder::SiteEmail, escape(&site.email))
        .set(Placeholder::BookData, book_data);
    values
}

/// The home page: site description and the full table of contents.
pub fn render_home(template: &Template, model: &ContentModel, site: &SiteInfo, book_data: &str) -> String {
    let content = html! {
        @if !site.description.is_empty() {
            p.site-description { (site.description) }
        }
        @if model.is_empty() {
            p.empty { "Nothing here yet." }
        }
    };
    let mut values = site_values(site, book_data);
    values
        .set(Placeholder::PageTitle, escape(&site.title))
        .set(Placeholder::PageSubtitle, escape(&site.subtitle))
        .set(Placeholder::CanonicalUrl, escape(&canonical_url(site, "/")))
        .set(Placeholder::Content, content.into_string())
        .set(Placeholder::Toc, toc(&model.navigation(), None).into_string());
    template.render(&values)
}

/// One chapter page. `body` is the already sealed or published body.
pub fn render_chapter(
    template: &Template,
    item: &ContentItem,
    body: &PageBody,
    model: &ContentModel,
    site: &SiteInfo,
    book_data: &str,
) -> String {
    let (prev, next) = model.neighbors(item.global_index);
    let content = html! {
        (article_header(item))
        @match body {
            PageBody::Published(body_html) => {
                div.entry-body { (PreEscaped(body_html)) }
            }
            PageBody::Encrypted(payload) => {
                (encrypted_shell(payload))
            }
        }
    };

    let mut values = site_values(site, book_data);
    values
        .set(Placeholder::PageTitle, escape(item.title()))
        .set(Placeholder::PageSubtitle, escape(item.subtitle().unwrap_or("")))
        .set(Placeholder::PageType, item.kind.as_str())
        .set(Placeholder::Category, escape(item.category().unwrap_or("")))
        .set(Placeholder::Tags, escape(&item.tags().join(", ")))
        .set(Placeholder::Illustration, illustration(item).into_string())
        .set(Placeholder::CanonicalUrl, escape(&canonical_url(site, &chapter_href(&item.slug))))
        .set(Placeholder::Content, content.into_string())
        .set(Placeholder::Toc, toc(&model.navigation(), Some(item.global_index)).into_string())
        .set(Placeholder::PrevLink, prev_link(prev).into_string())
        .set(Placeholder::NextLink, next_link(next).into_string());
    template.render(&values)
}

/// Read the encrypted container back out of a generated page.
///
/// Returns `None` when the page has no container or a field is missing.
/// A missing `data-iterations` means the default count.
pub fn extract_payload(page_html: &str) -> Option<EncryptedPayload> {
    let tag = CONTAINER_TAG.find(page_html)?.as_str();
    let mut ciphertext = None;
    let mut iv = None;
    let mut salt = None;
    let mut iterations = crypto::ITERATIONS;
    for caps in DATA_ATTR.captures_iter(tag) {
        let value = caps[2].to_string();
        match &caps[1] {
            "encrypted" => ciphertext = Some(value),
            "iv" => iv = Some(value),
            "salt" => salt = Some(value),
            _ => iterations = value.parse().ok()?,
        }
    }
    Some(EncryptedPayload {
        ciphertext: ciphertext?,
        iv: iv?,
        salt: salt?,
        iterations,
    })
}
