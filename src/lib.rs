//! # Memory Book
//!
//! A static site generator for memory books and digital journals. A single
//! `config.json` lists Markdown files in reading order; each file becomes a
//! page, and pages whose front matter carries a `password` are encrypted at
//! build time and unlocked in the browser.
//!
//! # Pipeline
//!
//! ```text
//! config.json ─┐
//! content/*.md ┼─▶ ContentModel ─▶ render (templates + maud) ─▶ minify ─▶ dist/
//! templates/  ─┘                        │
//!                                       └─ password? ─▶ PBKDF2 + AES-GCM
//! ```
//!
//! Everything is loaded into a [`generate::Plan`] before a byte is written,
//! then pages are rendered in parallel on a rayon pool. A missing or
//! malformed content file skips that page with a warning; a bad config or
//! template aborts the whole build.
//!
//! # Output Layout
//!
//! ```text
//! dist/
//! ├── index.html                     # Home: site header + table of contents
//! ├── chapter/<slug>/index.html      # One per item, in reading order
//! ├── assets/style.css
//! ├── assets/reader.js               # Theme, TOC, keyboard nav, unlock form
//! ├── static/…                       # Copied from <source>/static/
//! ├── sitemap.xml
//! └── robots.txt
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.json` loading, validation, stock config |
//! | [`frontmatter`] | `---` delimited metadata block parsing |
//! | [`markdown`] | Markdown to HTML with image path and bare-URL rewriting |
//! | [`naming`] | Filename to slug and display title |
//! | [`content`] | The ordered content model built from config and files |
//! | [`crypto`] | Page encryption, and decryption for the `decrypt` command |
//! | [`template`] | Placeholder templates, built-in or from `<source>/templates/` |
//! | [`render`] | Page fragments (TOC, pager, headers) and page assembly |
//! | [`minify`] | HTML/CSS/JS minification with fallback to the original |
//! | [`assets`] | Static directory copying |
//! | [`sitemap`] | `sitemap.xml` and `robots.txt` |
//! | [`generate`] | The build: plan, parallel emit, decrypt a built page |
//! | [`merge`] | Concatenate all chapters into one Markdown file |
//! | [`types`] | Types serialized into pages for the reader script |
//! | [`output`] | CLI output formatting |
//!
//! # Page Protection
//!
//! A protected page never contains its plaintext. The rendered body is
//! sealed with AES-256-GCM under a key derived by PBKDF2-HMAC-SHA256 from
//! the page password, with a fresh salt and IV per page per build. The
//! ciphertext, IV, salt and iteration count are embedded as `data-*`
//! attributes and decrypted by `reader.js` through WebCrypto. Titles stay
//! visible in navigation; passwords never leave the build.

pub mod assets;
pub mod config;
pub mod content;
pub mod crypto;
pub mod frontmatter;
pub mod generate;
pub mod markdown;
pub mod merge;
pub mod minify;
pub mod naming;
pub mod output;
pub mod render;
pub mod sitemap;
pub mod template;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
