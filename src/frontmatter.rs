//! Front-matter extraction.
//!
//! A content file may open with a metadata block fenced by `---` lines:
//!
//! ```text
//! ---
//! title: "Summer at the Lake"
//! subtitle: 1998
//! tags: [family, "lake house", summer]
//! password: 'hunter2'
//! ---
//! # Summer at the Lake
//! ...
//! ```
//!
//! This is *not* YAML. Each line is a flat `key: value` pair:
//! the key is everything before the first colon, the value everything after,
//! both trimmed, with one pair of matching surrounding quotes removed. Only
//! `tags` understands the bracketed list form. Malformed lines are skipped
//! rather than rejected: a typo costs one field, not the page.

use std::collections::BTreeMap;

/// The line that opens and closes a front-matter block.
pub const DELIMITER: &str = "---";

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Scalar(String),
    List(Vec<String>),
}

impl MetaValue {
    /// The scalar form, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Scalar(s) => Some(s),
            MetaValue::List(_) => None,
        }
    }
}

/// Parsed front-matter keys. Ordered so serialization is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, MetaValue>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries.get(key)
    }

    /// A scalar value, treating empty strings as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(MetaValue::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Tags as a list. A scalar `tags:` value counts as a single tag.
    pub fn tags(&self) -> Vec<String> {
        match self.get("tags") {
            Some(MetaValue::List(items)) => items.clone(),
            Some(MetaValue::Scalar(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Split raw file text into metadata and body.
///
/// If the first line is not exactly [`DELIMITER`] the whole text is body.
/// A block that is never closed consumes the rest of the file as metadata
/// and leaves an empty body.
pub fn parse(raw: &str) -> (Metadata, String) {
    let lines: Vec<&str> = raw.split('\n').map(strip_cr).collect();

    if lines.first() != Some(&DELIMITER) {
        return (Metadata::new(), raw.to_string());
    }

    let mut metadata = Metadata::new();
    let mut body_start = lines.len();

    for (idx, line) in lines.iter().enumerate().skip(1) {
        if *line == DELIMITER {
            body_start = idx + 1;
            break;
        }
        if let Some((key, value)) = parse_line(line) {
            metadata.insert(key, value);
        }
    }

    let body = lines.get(body_start..).unwrap_or_default().join("\n");
    (metadata, body)
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Parse one `key: value` line. `None` for lines without a usable key.
fn parse_line(line: &str) -> Option<(String, MetaValue)> {
    let colon = line.find(':')?;
    if colon == 0 {
        return None;
    }
    let key = line[..colon].trim();
    if key.is_empty() {
        return None;
    }
    let raw_value = line[colon + 1..].trim();

    let value = if key == "tags" {
        match parse_list(raw_value) {
            Some(items) => MetaValue::List(items),
            None => MetaValue::Scalar(strip_quotes(raw_value).to_string()),
        }
    } else {
        MetaValue::Scalar(strip_quotes(raw_value).to_string())
    };
    Some((key.to_string(), value))
}

/// `[a, "b", 'c']` → `["a", "b", "c"]`. `None` if not bracketed.
fn parse_list(value: &str) -> Option<Vec<String>> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(
        inner
            .split(',')
            .map(|item| strip_quotes(item.trim()).to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

/// Remove one pair of matching `"` or `'` around a value.
fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Write metadata back out as a front-matter block that [`parse`] reads
/// back to the same value.
///
/// Scalars are always double-quoted so leading/trailing whitespace and
/// embedded quotes survive the trim-then-unquote step on the way back in.
pub fn serialize(metadata: &Metadata) -> String {
    let mut out = String::new();
    out.push_str(DELIMITER);
    out.push('\n');
    for (key, value) in metadata.iter() {
        match value {
            MetaValue::Scalar(s) => out.push_str(&format!("{key}: \"{s}\"\n")),
            MetaValue::List(items) => {
                let quoted: Vec<String> = items.iter().map(|i| format!("\"{i}\"")).collect();
                out.push_str(&format!("{key}: [{}]\n", quoted.join(", ")));
            }
        }
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out
}
