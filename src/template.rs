//! Page templates with typed placeholders.
//!
//! A template is plain HTML with `{{NAME}}` tokens. Every name a template
//! may use is a [`Placeholder`] variant; a token with an uppercase name that
//! is not one of them is rejected when the template is loaded, so a typo
//! like `{{PAGE_TILTE}}` stops the build instead of silently rendering
//! nothing. Brace pairs that do not look like a token (`{{ x }}`,
//! `{{lower}}`) are ordinary text.
//!
//! Templates are parsed once into segments. Rendering walks the segments and
//! writes each value exactly once, so a value that happens to contain
//! `{{CONTENT}}` comes out literally. A placeholder with no value renders as
//! the empty string.
//!
//! Values are inserted verbatim: callers escape text before handing it over
//! (see [`crate::render`]).

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Directory inside the source root that overrides the built-in templates.
pub const TEMPLATES_DIR: &str = "templates";
pub const HOME_TEMPLATE: &str = "home.html";
pub const CHAPTER_TEMPLATE: &str = "chapter.html";

const BUILTIN_HOME: &str = include_str!("../static/templates/home.html");
const BUILTIN_CHAPTER: &str = include_str!("../static/templates/chapter.html");

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z][A-Z0-9_]*)\}\}").expect("static regex"));

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template {template} uses unknown placeholder {{{{{name}}}}}")]
    UnknownPlaceholder { template: String, name: String },
    #[error("template {0} has no {{{{CONTENT}}}} placeholder")]
    MissingContent(String),
}

macro_rules! placeholders {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Every name a template may reference.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Placeholder {
            $($variant),+
        }

        impl Placeholder {
            pub const ALL: &'static [Placeholder] = &[$(Placeholder::$variant),+];

            /// Token name as written between the braces.
            pub fn name(self) -> &'static str {
                match self {
                    $(Placeholder::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Placeholder::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

placeholders! {
    SiteTitle => "SITE_TITLE",
    SiteSubtitle => "SITE_SUBTITLE",
    SiteAuthor => "SITE_AUTHOR",
    SiteDescription => "SITE_DESCRIPTION",
    SiteKeywords => "SITE_KEYWORDS",
    SiteUrl => "SITE_URL",
    SiteEmail => "SITE_EMAIL",
    PageTitle => "PAGE_TITLE",
    PageSubtitle => "PAGE_SUBTITLE",
    PageType => "PAGE_TYPE",
    Category => "CATEGORY",
    Tags => "TAGS",
    Illustration => "ILLUSTRATION",
    Content => "CONTENT",
    Toc => "TOC",
    PrevLink => "PREV_LINK",
    NextLink => "NEXT_LINK",
    CanonicalUrl => "CANONICAL_URL",
    BookData => "BOOK_DATA",
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}}}}}", self.name())
    }
}

/// Values for one page render.
#[derive(Debug, Clone, Default)]
pub struct Values {
    map: BTreeMap<Placeholder, String>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, placeholder: Placeholder, value: impl Into<String>) -> &mut Self {
        self.map.insert(placeholder, value.into());
        self
    }

    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.map.get(&placeholder).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A parsed template.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template source. `name` is only used in error messages.
    pub fn parse(name: &str, source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in TOKEN.captures_iter(source) {
            let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let placeholder = Placeholder::from_name(token.as_str()).ok_or_else(|| {
                TemplateError::UnknownPlaceholder {
                    template: name.to_string(),
                    name: token.as_str().to_string(),
                }
            })?;
            if whole.start() > last {
                segments.push(Segment::Text(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Slot(placeholder));
            last = whole.end();
        }
        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }

        if !segments.contains(&Segment::Slot(Placeholder::Content)) {
            return Err(TemplateError::MissingContent(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            segments,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholders used, in order of first appearance.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if let Segment::Slot(p) = segment
                && !seen.contains(p)
            {
                seen.push(*p);
            }
        }
        seen
    }

    /// Fill every slot from `values`; unset slots become empty.
    pub fn render(&self, values: &Values) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(p) => out.push_str(values.get(*p).unwrap_or("")),
            }
        }
        out
    }
}

/// The two page templates a build needs.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub home: Template,
    pub chapter: Template,
    /// Where the templates came from; `None` for the built-ins.
    pub origin: Option<PathBuf>,
}

impl TemplateSet {
    /// Templates compiled into the binary.
    pub fn builtin() -> Result<Self, TemplateError> {
        Ok(Self {
            home: Template::parse(HOME_TEMPLATE, BUILTIN_HOME)?,
            chapter: Template::parse(CHAPTER_TEMPLATE, BUILTIN_CHAPTER)?,
            origin: None,
        })
    }

    /// Templates from `<source>/templates/` if that directory exists,
    /// otherwise the built-ins.
    pub fn load(source_root: &Path) -> Result<Self, TemplateError> {
        let dir = source_root.join(TEMPLATES_DIR);
        if !dir.is_dir() {
            return Self::builtin();
        }
        Ok(Self {
            home: load_template(&dir, HOME_TEMPLATE)?,
            chapter: load_template(&dir, CHAPTER_TEMPLATE)?,
            origin: Some(dir),
        })
    }
}

fn load_template(dir: &Path, filename: &str) -> Result<Template, TemplateError> {
    let path = dir.join(filename);
    if !path.is_file() {
        return Err(TemplateError::Missing(path));
    }
    let source = fs::read_to_string(&path).map_err(|source| TemplateError::Io {
        path: path.clone(),
        source,
    })?;
    Template::parse(filename, &source)
}

/// Built-in template sources, for `gen-templates`.
pub fn builtin_sources() -> [(&'static str, &'static str); 2] {
    [(HOME_TEMPLATE, BUILTIN_HOME), (CHAPTER_TEMPLATE, BUILTIN_CHAPTER)]
}
