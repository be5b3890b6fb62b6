//! Shared types used across the build pipeline and the generated pages.
//!
//! [`NavigationEntry`] and [`PageData`] are serialized into every page as
//! JSON and read by `static/reader.js`, so their field names (camelCase) are
//! a wire format. Renaming a field here breaks published sites.

use crate::config::SiteInfo;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What `encodeURIComponent` leaves alone; `reader.js` builds hrefs with it.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Which configured list a content item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Preface,
    Chapter,
    Epilogue,
}

impl ContentKind {
    /// Singular label, as serialized (`"preface"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Preface => "preface",
            ContentKind::Chapter => "chapter",
            ContentKind::Epilogue => "epilogue",
        }
    }

    /// Name of the config list this kind is read from (`"prefaces"`).
    pub fn section_name(self) -> &'static str {
        match self {
            ContentKind::Preface => "prefaces",
            ContentKind::Chapter => "chapters",
            ContentKind::Epilogue => "epilogues",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public-safe projection of a content item for tables of contents.
///
/// Never carries the body or the password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Config list name: `prefaces`, `chapters` or `epilogues`.
    pub section_type: String,
    pub global_index: usize,
    pub is_encrypted: bool,
}

impl NavigationEntry {
    /// Site-relative URL of the entry's page.
    pub fn href(&self) -> String {
        chapter_href(&self.slug)
    }
}

/// Site-relative URL of a chapter page: `/chapter/<slug>/`.
///
/// The slug is percent-encoded the same way `reader.js` encodes it, so TOC
/// links, pager links and keyboard navigation land on identical URLs.
pub fn chapter_href(slug: &str) -> String {
    format!("/chapter/{}/", utf8_percent_encode(slug, URI_COMPONENT))
}

/// Everything the client-side reader needs, handed over explicitly.
///
/// Embedded as `<script type="application/json" id="book-data">` and passed
/// to `initReader()` rather than read from globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub site: SiteInfo,
    pub navigation: Vec<NavigationEntry>,
    /// Global index of the page being viewed; `None` on the home page.
    pub current_index: Option<usize>,
}

impl PageData {
    /// JSON safe to place inside a `<script>` element.
    ///
    /// `<` is escaped so no value can close the script tag early.
    pub fn to_script_json(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(json.replace('<', "\\u003c"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> NavigationEntry {
        NavigationEntry {
            title: "Intro".into(),
            subtitle: None,
            category: Some("family".into()),
            slug: "01-intro".into(),
            kind: ContentKind::Preface,
            section_type: ContentKind::Preface.section_name().into(),
            global_index: 0,
            is_encrypted: true,
        }
    }

    #[test]
    fn navigation_entry_wire_names() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["type"], "preface");
        assert_eq!(json["sectionType"], "prefaces");
        assert_eq!(json["globalIndex"], 0);
        assert_eq!(json["isEncrypted"], true);
        assert_eq!(json["category"], "family");
        assert!(json.get("subtitle").is_none());
    }

    #[test]
    fn href_uses_chapter_directory() {
        assert_eq!(entry().href(), "/chapter/01-intro/");
    }

    #[test]
    fn href_encodes_like_encode_uri_component() {
        assert_eq!(chapter_href("01-夏天"), "/chapter/01-%E5%A4%8F%E5%A4%A9/");
        assert_eq!(chapter_href("a+b=c"), "/chapter/a%2Bb%3Dc/");
        assert_eq!(chapter_href("it's_(v1).!~*"), "/chapter/it's_(v1).!~*/");
    }

    #[test]
    fn script_json_cannot_close_script_tag() {
        let mut nav = entry();
        nav.title = "</script><script>alert(1)</script>".into();
        let data = PageData {
            site: SiteInfo::default(),
            navigation: vec![nav],
            current_index: Some(0),
        };
        let json = data.to_script_json().unwrap();
        assert!(!json.contains("</script>"));
        let back: PageData = serde_json::from_str(&json).unwrap();
        assert_eq!(back.navigation[0].title, "</script><script>alert(1)</script>");
        assert_eq!(back.current_index, Some(0));
    }

    #[test]
    fn home_page_has_no_current_index() {
        let data = PageData {
            site: SiteInfo::default(),
            navigation: vec![],
            current_index: None,
        };
        let json = serde_json::to_value(&data).unwrap();
        assert!(json["currentIndex"].is_null());
    }
}
