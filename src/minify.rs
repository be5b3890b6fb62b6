//! Best-effort minification of generated HTML, CSS and JS.
//!
//! The transforms are small: comments go, whitespace runs
//! collapse. Anything that does not scan cleanly (an unterminated comment or
//! string, unbalanced braces, an unclosed `<pre>`) is left exactly as it
//! was, and the caller gets a diagnostic instead of an error. A build never
//! fails because of minification.
//!
//! In HTML the contents of `<pre>`, `<textarea>`, `<script>` and `<style>`
//! are never touched.

use regex::{Captures, Regex};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::LazyLock;
use thiserror::Error;

static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("static regex")
});
static OPEN_PROTECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(pre|textarea|script|style)\b").expect("static regex"));
static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Html,
    Css,
    Js,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetKind::Html => "HTML",
            AssetKind::Css => "CSS",
            AssetKind::Js => "JS",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
enum MinifyError {
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unbalanced braces")]
    UnbalancedBraces,
    #[error("unclosed <{0}> block")]
    UnclosedBlock(String),
}

/// Minifier output. `diagnostic` is set when the input was returned as is.
#[derive(Debug, Clone, PartialEq)]
pub struct Minified {
    pub output: String,
    pub diagnostic: Option<String>,
}

impl Minified {
    pub fn fell_back(&self) -> bool {
        self.diagnostic.is_some()
    }
}

/// Minify `input`, falling back to it unchanged on any scan problem.
pub fn minify(kind: AssetKind, input: &str) -> Minified {
    let result = match kind {
        AssetKind::Html => minify_html(input),
        AssetKind::Css => minify_css(input),
        AssetKind::Js => minify_js(input),
    };
    match result {
        Ok(output) => Minified {
            output,
            diagnostic: None,
        },
        Err(e) => Minified {
            output: input.to_string(),
            diagnostic: Some(format!("{kind} left unminified: {e}")),
        },
    }
}

/// [`minify`] when `enabled`, otherwise a pass-through.
pub fn minify_if(enabled: bool, kind: AssetKind, input: String) -> Minified {
    if enabled {
        minify(kind, &input)
    } else {
        Minified {
            output: input,
            diagnostic: None,
        }
    }
}

// ============================================================================
// HTML
// ============================================================================

fn minify_html(input: &str) -> Result<String, MinifyError> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for block in PROTECTED.find_iter(input) {
        out.push_str(&collapse_html(&input[last..block.start()])?);
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&collapse_html(&input[last..])?);
    Ok(out.trim().to_string())
}

/// Strip comments and collapse whitespace in HTML outside protected blocks.
fn collapse_html(chunk: &str) -> Result<String, MinifyError> {
    if HTML_COMMENT.replace_all(chunk, "").contains("<!--") {
        return Err(MinifyError::UnterminatedComment);
    }
    let stripped = HTML_COMMENT.replace_all(chunk, |caps: &Captures<'_>| {
        // conditional comments are markup
        if caps[0].starts_with("<!--[if") {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    if let Some(open) = OPEN_PROTECTED.captures(&stripped) {
        return Err(MinifyError::UnclosedBlock(open[1].to_ascii_lowercase()));
    }
    Ok(WHITESPACE.replace_all(&stripped, " ").into_owned())
}

// ============================================================================
// CSS
// ============================================================================

fn minify_css(input: &str) -> Result<String, MinifyError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut depth = 0i32;
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars)?;
                pending_space = true;
            }
            '"' | '\'' => {
                if pending_space && needs_css_space(&out, c) {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                copy_string(&mut chars, c, &mut out)?;
            }
            c if c.is_whitespace() => pending_space = true,
            _ => {
                match c {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth < 0 {
                            return Err(MinifyError::UnbalancedBraces);
                        }
                        if out.ends_with(';') {
                            out.pop();
                        }
                    }
                    _ => {}
                }
                if pending_space && needs_css_space(&out, c) {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    if depth != 0 {
        return Err(MinifyError::UnbalancedBraces);
    }
    Ok(out)
}

/// A space survives unless punctuation on either side makes it redundant.
/// A space before `:` is kept (`a :hover` is a descendant selector).
fn needs_css_space(out: &str, next: char) -> bool {
    match out.chars().next_back() {
        None => false,
        Some(prev) => {
            !matches!(prev, '{' | '}' | ';' | ',' | ':' | '>')
                && !matches!(next, '{' | '}' | ';' | ',' | '>')
        }
    }
}

// ============================================================================
// JS
// ============================================================================

/// Comments removed, blank lines dropped, indentation and interior whitespace
/// runs collapsed. Line breaks are kept so automatic semicolon insertion
/// behaves exactly as before.
fn minify_js(input: &str) -> Result<String, MinifyError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                skip_block_comment(&mut chars)?;
                pending_space = true;
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
                push_js_newline(&mut out);
                pending_space = false;
            }
            '\n' => {
                push_js_newline(&mut out);
                pending_space = false;
            }
            c if c.is_whitespace() => pending_space = true,
            _ => {
                if pending_space && !out.is_empty() && !out.ends_with('\n') {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                match c {
                    '"' | '\'' => copy_string(&mut chars, c, &mut out)?,
                    '`' => copy_template_literal(&mut chars, &mut out)?,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(out.trim_end().to_string())
}

fn push_js_newline(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

// ============================================================================
// Shared scanning
// ============================================================================

/// Consume through the closing `*/`. The opening `/*` is already consumed.
fn skip_block_comment(chars: &mut Peekable<Chars<'_>>) -> Result<(), MinifyError> {
    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'/') {
            chars.next();
            return Ok(());
        }
    }
    Err(MinifyError::UnterminatedComment)
}

/// Copy a quoted string through its closing quote. The opening quote is
/// already in `out`. Strings may not span lines.
fn copy_string(
    chars: &mut Peekable<Chars<'_>>,
    quote: char,
    out: &mut String,
) -> Result<(), MinifyError> {
    while let Some(c) = chars.next() {
        if c == '\n' {
            return Err(MinifyError::UnterminatedString);
        }
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == quote {
            return Ok(());
        }
    }
    Err(MinifyError::UnterminatedString)
}

fn copy_template_literal(
    chars: &mut Peekable<Chars<'_>>,
    out: &mut String,
) -> Result<(), MinifyError> {
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else if c == '`' {
            return Ok(());
        }
    }
    Err(MinifyError::UnterminatedString)
}
