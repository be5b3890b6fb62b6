//! Content model: configured filenames → ordered, indexed content items.
//!
//! The builder walks the three configured lists in reading order
//! (prefaces, chapters, epilogues), reads and parses each file, and assigns
//! every item it keeps a `global_index`. Indices are handed out as items are
//! accepted, so they are contiguous from zero no matter how many listed files
//! were skipped along the way.
//!
//! ## Skipped items
//!
//! A listed file is skipped, with a [`BuildWarning`] recorded and logged,
//! when it:
//! - does not exist, or cannot be read as UTF-8
//! - has a name that leaves nothing usable as a slug
//! - points outside the content directory (`..`, absolute paths)
//! - produces a slug already taken by an earlier item
//!
//! None of these stop the build.
//!
//! ## Immutability
//!
//! A [`ContentModel`] is produced in one call and only handed out by shared
//! reference afterwards. There is no way to add items to an existing model;
//! a new build builds a new model.

use crate::config::SiteConfig;
use crate::frontmatter::{self, Metadata};
use crate::markdown;
use crate::naming;
use crate::types::{ContentKind, NavigationEntry};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Conventional content directory name inside the source root.
pub const CONTENT_DIR: &str = "content";

/// One parsed content file.
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// URL path segment, unique within the site.
    pub slug: String,
    /// Filename as listed in the config.
    pub source: String,
    pub kind: ContentKind,
    pub metadata: Metadata,
    /// Rendered body, images already normalized.
    pub body_html: String,
    /// Position in prefaces ⧺ chapters ⧺ epilogues.
    pub global_index: usize,
    fallback_title: String,
}

impl ContentItem {
    /// Title: front matter → first `# ` heading → filename.
    ///
    /// Protected items skip the heading step.
    pub fn title(&self) -> &str {
        self.metadata
            .get_str("title")
            .unwrap_or(&self.fallback_title)
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.metadata.get_str("subtitle")
    }

    pub fn category(&self) -> Option<&str> {
        self.metadata.get_str("category")
    }

    pub fn tags(&self) -> Vec<String> {
        self.metadata.tags()
    }

    pub fn illustration(&self) -> Option<&str> {
        self.metadata.get_str("illustration")
    }

    /// The page password, if one is set.
    pub fn password(&self) -> Option<&str> {
        self.metadata.get_str("password")
    }

    pub fn is_encrypted(&self) -> bool {
        self.password().is_some()
    }

    pub fn navigation_entry(&self) -> NavigationEntry {
        NavigationEntry {
            title: self.title().to_string(),
            subtitle: self.subtitle().map(str::to_string),
            category: self.category().map(str::to_string),
            slug: self.slug.clone(),
            kind: self.kind,
            section_type: self.kind.section_name().to_string(),
            global_index: self.global_index,
            is_encrypted: self.is_encrypted(),
        }
    }
}

/// Why a listed file did not make it into the model.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Missing,
    Unreadable(String),
    InvalidName,
    OutsideContentDir,
    DuplicateSlug { slug: String, first: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Missing => f.write_str("file not found"),
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::InvalidName => f.write_str("filename yields no usable slug"),
            SkipReason::OutsideContentDir => f.write_str("path leaves the content directory"),
            SkipReason::DuplicateSlug { slug, first } => {
                write!(f, "slug '{slug}' already used by {first}")
            }
        }
    }
}

/// A non-fatal problem recorded while building the model.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildWarning {
    pub kind: ContentKind,
    pub filename: String,
    pub reason: SkipReason,
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped {} '{}': {}",
            self.kind, self.filename, self.reason
        )
    }
}

/// Where content text comes from.
///
/// The filesystem in production; an in-memory map in tests.
pub trait ContentSource {
    fn read(&self, filename: &str) -> io::Result<String>;
}

/// Reads content files relative to a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for DirSource {
    fn read(&self, filename: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(filename))
    }
}

/// The ordered content of one build.
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    prefaces: Vec<ContentItem>,
    chapters: Vec<ContentItem>,
    epilogues: Vec<ContentItem>,
    warnings: Vec<BuildWarning>,
}

impl ContentModel {
    /// Build from `<source>/content/` using the lists in `config`.
    pub fn load(source_root: &Path, config: &SiteConfig) -> Self {
        let source = DirSource::new(source_root.join(CONTENT_DIR));
        Self::build(&source, config)
    }

    /// Build from any content source.
    pub fn build(source: &impl ContentSource, config: &SiteConfig) -> Self {
        let mut model = ContentModel::default();
        let mut taken: HashMap<String, String> = HashMap::new();
        let mut next_index = 0usize;

        for (kind, filenames) in config.sections() {
            for filename in filenames {
                match read_item(source, kind, filename, &taken) {
                    Ok((slug, metadata, body)) => {
                        // A protected body is sealed, so its heading cannot name the page.
                        let parsed_title = if metadata.get_str("password").is_some() {
                            None
                        } else {
                            first_heading(&body)
                        };
                        let fallback_title = parsed_title
                            .unwrap_or_else(|| display_title(filename, &slug));
                        let item = ContentItem {
                            slug: slug.clone(),
                            source: filename.clone(),
                            kind,
                            metadata,
                            body_html: markdown::render(&body),
                            global_index: next_index,
                            fallback_title,
                        };
                        debug!(slug = %item.slug, index = next_index, "parsed {kind} {filename}");
                        next_index += 1;
                        taken.insert(slug, filename.clone());
                        model.collection_mut(kind).push(item);
                    }
                    Err(reason) => {
                        let warning = BuildWarning {
                            kind,
                            filename: filename.clone(),
                            reason,
                        };
                        warn!(section = kind.section_name(), "{warning}");
                        model.warnings.push(warning);
                    }
                }
            }
        }
        model
    }

    fn collection_mut(&mut self, kind: ContentKind) -> &mut Vec<ContentItem> {
        match kind {
            ContentKind::Preface => &mut self.prefaces,
            ContentKind::Chapter => &mut self.chapters,
            ContentKind::Epilogue => &mut self.epilogues,
        }
    }

    pub fn prefaces(&self) -> &[ContentItem] {
        &self.prefaces
    }

    pub fn chapters(&self) -> &[ContentItem] {
        &self.chapters
    }

    pub fn epilogues(&self) -> &[ContentItem] {
        &self.epilogues
    }

    /// Items of one kind.
    pub fn section(&self, kind: ContentKind) -> &[ContentItem] {
        match kind {
            ContentKind::Preface => &self.prefaces,
            ContentKind::Chapter => &self.chapters,
            ContentKind::Epilogue => &self.epilogues,
        }
    }

    /// All items in global order.
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> {
        self.prefaces
            .iter()
            .chain(self.chapters.iter())
            .chain(self.epilogues.iter())
    }

    pub fn len(&self) -> usize {
        self.prefaces.len() + self.chapters.len() + self.epilogues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at a global index.
    pub fn get(&self, global_index: usize) -> Option<&ContentItem> {
        let mut idx = global_index;
        for section in [&self.prefaces, &self.chapters, &self.epilogues] {
            if idx < section.len() {
                return section.get(idx);
            }
            idx -= section.len();
        }
        None
    }

    pub fn find(&self, slug: &str) -> Option<&ContentItem> {
        self.items().find(|item| item.slug == slug)
    }

    /// The items before and after a global index.
    pub fn neighbors(&self, global_index: usize) -> (Option<&ContentItem>, Option<&ContentItem>) {
        let prev = global_index
            .checked_sub(1)
            .and_then(|i| self.get(i));
        (prev, self.get(global_index + 1))
    }

    /// Navigation projection of every item, in global order.
    pub fn navigation(&self) -> Vec<NavigationEntry> {
        self.items().map(ContentItem::navigation_entry).collect()
    }

    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }
}

/// Read and parse one listed file, or say why it is skipped.
fn read_item(
    source: &impl ContentSource,
    kind: ContentKind,
    filename: &str,
    taken: &HashMap<String, String>,
) -> Result<(String, Metadata, String), SkipReason> {
    if !naming::is_contained(filename) {
        return Err(SkipReason::OutsideContentDir);
    }
    let parsed = naming::parse_filename(filename).ok_or(SkipReason::InvalidName)?;
    if let Some(first) = taken.get(&parsed.slug) {
        return Err(SkipReason::DuplicateSlug {
            slug: parsed.slug,
            first: first.clone(),
        });
    }

    let raw = source.read(filename).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SkipReason::Missing,
        _ => SkipReason::Unreadable(e.to_string()),
    })?;

    let (metadata, body) = frontmatter::parse(&raw);
    debug!(%kind, filename, keys = metadata.len(), "front matter");
    Ok((parsed.slug, metadata, body))
}

/// Text of the first `# ` heading line, if any.
fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .find(|line| line.starts_with("# "))
        .map(|line| line.trim_start_matches("# ").trim().to_string())
        .filter(|title| !title.is_empty())
}

fn display_title(filename: &str, slug: &str) -> String {
    naming::parse_filename(filename)
        .map(|p| p.display_title)
        .unwrap_or_else(|| slug.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::test_helpers::{MemorySource, config_with};
    use proptest::prelude::*;

    #[test]
    fn orders_prefaces_chapters_epilogues() {
        let source = MemorySource::new(&[
            ("p.md", "# P"),
            ("c1.md", "# C1"),
            ("c2.md", "# C2"),
            ("e.md", "# E"),
        ]);
        let config = config_with(&["p.md"], &["c1.md", "c2.md"], &["e.md"]);
        let model = ContentModel::build(&source, &config);

        let slugs: Vec<&str> = model.items().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["p", "c1", "c2", "e"]);
        let indices: Vec<usize> = model.items().map(|i| i.global_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(model.prefaces()[0].kind, ContentKind::Preface);
        assert_eq!(model.epilogues()[0].kind, ContentKind::Epilogue);
        assert!(model.warnings().is_empty());
    }

    #[test]
    fn missing_file_is_skipped_without_gap() {
        let source = MemorySource::new(&[("a.md", "A"), ("b.md", "B")]);
        let config = config_with(&[], &["a.md", "missing.md", "b.md"], &[]);
        let model = ContentModel::build(&source, &config);

        assert_eq!(model.len(), 2);
        assert_eq!(model.chapters()[0].global_index, 0);
        assert_eq!(model.chapters()[1].global_index, 1);
        assert_eq!(model.chapters()[1].slug, "b");
        assert_eq!(
            model.warnings(),
            &[BuildWarning {
                kind: ContentKind::Chapter,
                filename: "missing.md".into(),
                reason: SkipReason::Missing,
            }]
        );
    }

    #[test]
    fn duplicate_slug_is_skipped() {
        let source = MemorySource::new(&[("a.md", "A"), ("part/a.md", "A2")]);
        let config = config_with(&["a.md"], &["part/a.md", "a.md"], &[]);
        let model = ContentModel::build(&source, &config);

        assert_eq!(model.len(), 1);
        assert_eq!(model.warnings().len(), 2);
        assert!(matches!(
            &model.warnings()[0].reason,
            SkipReason::DuplicateSlug { slug, first } if slug == "a" && first == "a.md"
        ));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let source = MemorySource::new(&[("../secret.md", "nope")]);
        let config = config_with(&[], &["../secret.md"], &[]);
        let model = ContentModel::build(&source, &config);
        assert!(model.is_empty());
        assert_eq!(model.warnings()[0].reason, SkipReason::OutsideContentDir);
    }

    #[test]
    fn title_resolution_order() {
        let source = MemorySource::new(&[
            ("01-with-meta.md", "---\ntitle: Meta Title\n---\n# Heading"),
            ("02-with-heading.md", "intro\n# Heading Title\ntext"),
            ("03-bare-name.md", "just text"),
        ]);
        let config = config_with(
            &[],
            &["01-with-meta.md", "02-with-heading.md", "03-bare-name.md"],
            &[],
        );
        let model = ContentModel::build(&source, &config);
        let titles: Vec<&str> = model.items().map(ContentItem::title).collect();
        assert_eq!(titles, vec!["Meta Title", "Heading Title", "bare name"]);
    }

    #[test]
    fn protected_title_ignores_body_heading() {
        let source = MemorySource::new(&[(
            "04-the-affair.md",
            "---\npassword: \"secret\"\n---\n# The affair of 1994\nHello",
        )]);
        let config = config_with(&[], &["04-the-affair.md"], &[]);
        let model = ContentModel::build(&source, &config);
        let item = model.find("04-the-affair").unwrap();
        assert_eq!(item.title(), "the affair");
        let json = serde_json::to_string(&model.navigation()).unwrap();
        assert!(!json.contains("1994"));
    }

    #[test]
    fn dot_only_names_are_invalid() {
        let source = MemorySource::new(&[("a.md", "A"), ("...md", "takeover")]);
        let config = config_with(&[], &["a.md", "...md"], &[]);
        let model = ContentModel::build(&source, &config);
        assert_eq!(model.len(), 1);
        assert_eq!(model.warnings()[0].filename, "...md");
        assert_eq!(model.warnings()[0].reason, SkipReason::InvalidName);
    }

    #[test]
    fn encryption_flag_follows_password() {
        let source = MemorySource::new(&[
            ("open.md", "---\ntitle: Open\n---\nbody"),
            ("locked.md", "---\npassword: \"secret\"\n---\nbody"),
            ("blank.md", "---\npassword: \"\"\n---\nbody"),
        ]);
        let config = config_with(&[], &["open.md", "locked.md", "blank.md"], &[]);
        let model = ContentModel::build(&source, &config);
        let flags: Vec<bool> = model.items().map(ContentItem::is_encrypted).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(model.find("locked").unwrap().password(), Some("secret"));
    }

    #[test]
    fn navigation_never_leaks_password_or_body() {
        let source = MemorySource::new(&[(
            "locked.md",
            "---\ntitle: Locked\ncategory: diary\npassword: hunter2\n---\nsecret body text",
        )]);
        let config = config_with(&[], &["locked.md"], &[]);
        let model = ContentModel::build(&source, &config);
        let nav = model.navigation();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].category.as_deref(), Some("diary"));
        assert!(nav[0].is_encrypted);
        let json = serde_json::to_string(&nav).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("secret body text"));
    }

    #[test]
    fn body_is_rendered_with_images_normalized() {
        let source = MemorySource::new(&[("a.md", "# A\n\n![x](pics/x.jpg)")]);
        let config = config_with(&[], &["a.md"], &[]);
        let model = ContentModel::build(&source, &config);
        let html = &model.chapters()[0].body_html;
        assert!(html.contains("<h1>A</h1>"));
        assert!(html.contains("/static/pics/x.jpg"));
    }

    #[test]
    fn get_and_neighbors_cross_sections() {
        let source = MemorySource::new(&[("p.md", "P"), ("c.md", "C"), ("e.md", "E")]);
        let config = config_with(&["p.md"], &["c.md"], &["e.md"]);
        let model = ContentModel::build(&source, &config);

        assert_eq!(model.get(1).unwrap().slug, "c");
        assert!(model.get(3).is_none());
        let (prev, next) = model.neighbors(1);
        assert_eq!(prev.unwrap().slug, "p");
        assert_eq!(next.unwrap().slug, "e");
        let (prev, next) = model.neighbors(0);
        assert!(prev.is_none());
        assert_eq!(next.unwrap().slug, "c");
        assert!(model.neighbors(2).1.is_none());
    }

    #[test]
    fn load_reads_content_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let content = tmp.path().join(CONTENT_DIR);
        std::fs::create_dir_all(&content).unwrap();
        std::fs::write(content.join("a.md"), "# A").unwrap();
        std::fs::write(content.join("bad.md"), [0xff, 0xfe, 0x00]).unwrap();

        let config = config_with(&[], &["a.md", "bad.md", "gone.md"], &[]);
        let model = ContentModel::load(tmp.path(), &config);

        assert_eq!(model.len(), 1);
        assert!(matches!(model.warnings()[0].reason, SkipReason::Unreadable(_)));
        assert_eq!(model.warnings()[1].reason, SkipReason::Missing);
    }

    #[test]
    fn empty_config_gives_empty_model() {
        let model = ContentModel::build(&MemorySource::new(&[]), &SiteConfig::default());
        assert!(model.is_empty());
        assert!(model.navigation().is_empty());
    }

    proptest! {
        #[test]
        fn global_indices_are_contiguous(
            present in proptest::collection::vec(any::<bool>(), 0..24),
            split_a in 0usize..24,
            split_b in 0usize..24,
        ) {
            let names: Vec<String> = (0..present.len()).map(|i| format!("f{i}.md")).collect();
            let files: Vec<(&str, &str)> = names
                .iter()
                .zip(&present)
                .filter(|(_, here)| **here)
                .map(|(n, _)| (n.as_str(), "body"))
                .collect();
            let source = MemorySource::new(&files);

            let a = split_a.min(names.len());
            let b = split_b.clamp(a, names.len().max(a));
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let config = config_with(&refs[..a], &refs[a..b], &refs[b..]);
            let model = ContentModel::build(&source, &config);

            let expected = present.iter().filter(|p| **p).count();
            let indices: Vec<usize> = model.items().map(|i| i.global_index).collect();
            prop_assert_eq!(indices, (0..expected).collect::<Vec<_>>());
            prop_assert_eq!(model.warnings().len(), present.len() - expected);
        }
    }
}
