//! Markdown → HTML.
//!
//! Rendering goes through pulldown-cmark with an event-mapping pass in
//! between parser and HTML writer, which is where the house rules live:
//!
//! - **Line breaks**: a single newline inside a paragraph is a `<br>`. Journal
//!   entries are typed like letters, not like source code.
//! - **Bare URLs** (`https://…`, `www.…`) become links, except inside existing
//!   links, images and code.
//! - **Raw HTML** passes through untouched, apart from `<img src>` rewriting.
//! - **Image paths** are normalized by [`normalize_image_src`] so every local
//!   image resolves under `/static/`, whether it came from `![](…)` or a
//!   hand-written `<img>` tag.
//!
//! Output is a pure function of the input text.

use pulldown_cmark::{
    CowStr, Event, LinkType, Options, Parser, Tag, TagEnd, TextMergeStream, html,
};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// URL prefix every local image is rewritten under.
pub const STATIC_PREFIX: &str = "/static/";

static HTML_IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(<img\b[^>]*?\s)src(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#)
        .expect("static regex")
});

// Stops at whitespace, markup characters and full-width CJK punctuation.
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?://|www\.)[^\s<>"'`，。、；：！？（）「」《》【】]+"#).expect("static regex")
});

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Render a Markdown body to an HTML fragment.
pub fn render(body: &str) -> String {
    let parser = TextMergeStream::new(Parser::new_ext(body, options()));

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut link_depth = 0usize;
    let mut image_depth = 0usize;
    let mut in_code_block = false;

    for event in parser {
        match event {
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                image_depth += 1;
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: CowStr::from(normalize_image_src(&dest_url)),
                    title,
                    id,
                }));
            }
            Event::End(TagEnd::Image) => {
                image_depth = image_depth.saturating_sub(1);
                events.push(Event::End(TagEnd::Image));
            }
            e @ Event::Start(Tag::Link { .. }) => {
                link_depth += 1;
                events.push(e);
            }
            Event::End(TagEnd::Link) => {
                link_depth = link_depth.saturating_sub(1);
                events.push(Event::End(TagEnd::Link));
            }
            e @ Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                events.push(e);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                events.push(Event::End(TagEnd::CodeBlock));
            }
            Event::SoftBreak => events.push(Event::HardBreak),
            Event::Html(raw) => events.push(Event::Html(CowStr::from(rewrite_html_images(&raw)))),
            Event::InlineHtml(raw) => {
                // Hand-written anchors count as links for autolinking purposes
                let lower = raw.to_ascii_lowercase();
                if lower.starts_with("<a ") || lower == "<a>" {
                    link_depth += 1;
                } else if lower.starts_with("</a") {
                    link_depth = link_depth.saturating_sub(1);
                }
                events.push(Event::InlineHtml(CowStr::from(rewrite_html_images(&raw))));
            }
            Event::Text(text) if link_depth == 0 && image_depth == 0 && !in_code_block => {
                push_linkified(&text, &mut events);
            }
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Map an image `src` onto the canonical asset root.
///
/// - external (`http…`, `//…`) and `data:` URLs are left alone
/// - `/static/…` is left alone
/// - otherwise one leading `/` is dropped, then `static/…` gets a leading
///   `/` and anything else gets `/static/` in front
///
/// Applying it twice gives the same result as applying it once.
pub fn normalize_image_src(src: &str) -> String {
    if src.starts_with("http") || src.starts_with("//") || src.starts_with("data:") {
        return src.to_string();
    }
    if src.starts_with(STATIC_PREFIX) {
        return src.to_string();
    }
    let rest = src.strip_prefix('/').unwrap_or(src);
    if rest.starts_with("static/") {
        format!("/{rest}")
    } else {
        format!("{STATIC_PREFIX}{rest}")
    }
}

/// Rewrite every quoted `src` of an `<img>` tag inside a raw HTML chunk.
fn rewrite_html_images(raw: &str) -> String {
    HTML_IMG_SRC
        .replace_all(raw, |caps: &Captures<'_>| {
            let (src, quote) = match (caps.get(3), caps.get(4)) {
                (Some(double), _) => (double.as_str(), '"'),
                (None, Some(single)) => (single.as_str(), '\''),
                (None, None) => ("", '"'),
            };
            format!(
                "{}src{}{quote}{}{quote}",
                &caps[1],
                &caps[2],
                normalize_image_src(src)
            )
        })
        .into_owned()
}

/// Split a text event around bare URLs, wrapping each URL in a link.
fn push_linkified(text: &str, events: &mut Vec<Event<'_>>) {
    let mut last = 0;
    for found in BARE_URL.find_iter(text) {
        let url = trim_trailing_punctuation(found.as_str());
        if url.len() <= "www.".len() {
            continue;
        }
        let start = found.start();
        let end = start + url.len();

        if start > last {
            events.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        events.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(href),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        events.push(Event::Text(CowStr::from(url.to_string())));
        events.push(Event::End(TagEnd::Link));
        last = end;
    }
    if last < text.len() {
        events.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Drop sentence punctuation that was swallowed by the URL pattern.
/// A closing paren is kept when it balances an opening one in the URL.
fn trim_trailing_punctuation(url: &str) -> &str {
    let mut end = url.len();
    while let Some(c) = url[..end].chars().next_back() {
        let trim = match c {
            '.' | ',' | ';' | ':' | '!' | '?' | '*' | '_' | '~' => true,
            ')' => {
                let opens = url[..end].matches('(').count();
                let closes = url[..end].matches(')').count();
                closes > opens
            }
            _ => false,
        };
        if !trim {
            break;
        }
        end -= c.len_utf8();
    }
    &url[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn renders_heading_and_paragraph() {
        let html = render("# Intro\nHello");
        assert!(html.contains("<h1>Intro</h1>"));
        assert!(html.contains("<p>Hello</p>"));
    }

    #[test]
    fn single_newline_is_line_break() {
        let html = render("line one\nline two");
        assert!(html.contains("line one<br />"));
        assert!(html.contains("line two"));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = render("before <span class=\"x\">inline</span> after\n\n<div class=\"box\">block</div>");
        assert!(html.contains("<span class=\"x\">inline</span>"));
        assert!(html.contains("<div class=\"box\">block</div>"));
    }

    #[test]
    fn bare_urls_become_links() {
        let html = render("see https://example.com/a?b=1 for details");
        assert!(html.contains("<a href=\"https://example.com/a?b=1\">https://example.com/a?b=1</a>"));
        assert!(html.contains("see "));
        assert!(html.contains(" for details"));
    }

    #[test]
    fn www_urls_get_scheme() {
        let html = render("visit www.example.org.");
        assert!(html.contains("<a href=\"http://www.example.org\">www.example.org</a>."));
    }

    #[test]
    fn existing_links_are_not_relinked() {
        let html = render("[https://example.com](https://example.com)");
        assert_eq!(html.matches("<a ").count(), 1);
    }

    #[test]
    fn code_is_not_linkified() {
        let html = render("```\nhttps://example.com\n```\n\n`https://inline.example`");
        assert!(!html.contains("<a "));
    }

    #[test]
    fn url_in_parentheses() {
        let html = render("(https://example.com/page)");
        assert!(html.contains("href=\"https://example.com/page\""));
        assert!(html.contains("</a>)"));
    }

    #[test]
    fn url_stops_at_cjk_punctuation() {
        let html = render("地址：https://example.com，欢迎");
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("，欢迎"));
    }

    #[test]
    fn markdown_image_is_normalized() {
        let html = render("![lake](images/lake.jpg)");
        assert!(html.contains("src=\"/static/images/lake.jpg\""));
        assert!(html.contains("alt=\"lake\""));
    }

    #[test]
    fn raw_html_image_is_normalized() {
        let html = render("<img class=\"wide\" src=\"photos/a.jpg\" alt=\"a\">");
        assert!(html.contains("src=\"/static/photos/a.jpg\""));
        assert!(html.contains("class=\"wide\""));
    }

    #[test]
    fn raw_html_single_quoted_src() {
        let html = render("<p><img src='/static/b.png'></p>");
        assert!(html.contains("src='/static/b.png'"));
    }

    #[test]
    fn data_src_attribute_is_untouched() {
        let out = rewrite_html_images("<img data-src=\"lazy.jpg\" src=\"a.jpg\">");
        assert_eq!(out, "<img data-src=\"lazy.jpg\" src=\"/static/a.jpg\">");
    }

    #[test]
    fn external_images_untouched() {
        assert_eq!(
            normalize_image_src("https://cdn.example.com/a.jpg"),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(normalize_image_src("//cdn.example.com/a.jpg"), "//cdn.example.com/a.jpg");
    }

    #[test]
    fn normalize_cases() {
        assert_eq!(normalize_image_src("/static/a.jpg"), "/static/a.jpg");
        assert_eq!(normalize_image_src("static/a.jpg"), "/static/a.jpg");
        assert_eq!(normalize_image_src("/img/a.jpg"), "/static/img/a.jpg");
        assert_eq!(normalize_image_src("a.jpg"), "/static/a.jpg");
        assert_eq!(normalize_image_src(""), "/static/");
    }

    #[test]
    fn rendering_is_deterministic() {
        let body = "# T\n\nsome *text* https://x.example\n\n![i](i.png)";
        assert_eq!(render(body), render(body));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(src in "[/a-z:.]{0,4}[a-zA-Z0-9/._:-]{0,30}") {
            let once = normalize_image_src(&src);
            prop_assert_eq!(normalize_image_src(&once), once.clone());
        }

        #[test]
        fn normalized_local_paths_live_under_static(src in "[a-z][a-z0-9/_-]{0,20}\\.(png|jpg)") {
            let out = normalize_image_src(&src);
            prop_assert!(out.starts_with(STATIC_PREFIX));
        }
    }
}
