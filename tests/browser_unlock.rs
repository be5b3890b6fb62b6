//! Browser tests for unlocking a protected page with `reader.js`.
//!
//! The page is sealed by the Rust build and opened by WebCrypto in Chrome,
//! so these cover both halves of the `data-encrypted` / `data-iv` /
//! `data-salt` / `data-iterations` wire format.
//!
//! Run with: `cargo test --test browser_unlock -- --ignored`

use headless_chrome::{Browser, LaunchOptions, Tab};
use memory_book::crypto::CipherParams;
use memory_book::generate::{self, BuildOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

const READER_JS: &str = include_str!("../static/reader.js");

const PROTECTED: &str =
    "---\ntitle: Lake\npassword: \"secret\"\n---\nThe spare key hangs behind the boathouse door.\n";

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

/// Build a one-page site with a protected chapter. Returns the page file.
fn build_protected_site(root: &Path) -> PathBuf {
    let source = root.join("src");
    fs::create_dir_all(source.join("content")).unwrap();
    fs::write(source.join("config.json"), r#"{"chapters": ["lake.md"]}"#).unwrap();
    fs::write(source.join("content/lake.md"), PROTECTED).unwrap();

    let output = root.join("dist");
    let options = BuildOptions {
        cipher: CipherParams { iterations: 1_000 },
        ..Default::default()
    };
    generate::build(&source, &output, options).expect("build failed");
    output.join(generate::page_path("lake"))
}

fn browser() -> &'static Browser {
    static B: OnceLock<Browser> = OnceLock::new();
    B.get_or_init(|| {
        Browser::new(LaunchOptions {
            window_size: Some((1280, 800)),
            ..Default::default()
        })
        .expect("failed to launch Chrome")
    })
}

/// Open a built page over `file://` and start the reader on it.
///
/// Asset URLs are site-absolute (`/assets/reader.js`), which `file://` cannot
/// resolve, so the bundled script is evaluated into the page directly.
fn open_page(file: &Path) -> Arc<Tab> {
    assert!(file.exists(), "missing: {}", file.display());
    let tab = browser().new_tab().unwrap();
    tab.navigate_to(&format!("file://{}", file.display()))
        .unwrap()
        .wait_until_navigated()
        .unwrap();
    tab.evaluate(READER_JS, false).expect("failed to load reader.js");
    tab.evaluate(
        r#"initReader(JSON.parse(document.getElementById("book-data").textContent))"#,
        false,
    )
    .expect("failed to start reader");
    tab
}

fn eval_str(tab: &Tab, expr: &str) -> String {
    tab.evaluate(expr, false)
        .expect("failed to evaluate JS")
        .value
        .expect("no value returned")
        .as_str()
        .expect("not a string")
        .to_string()
}

fn submit_password(tab: &Tab, password: &str) {
    tab.find_element("#page-password")
        .unwrap()
        .type_into(password)
        .unwrap();
    tab.find_element("#password-form button")
        .unwrap()
        .click()
        .unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
#[ignore]
fn correct_password_renders_body() {
    let tmp = TempDir::new().unwrap();
    let tab = open_page(&build_protected_site(tmp.path()));

    submit_password(&tab, "secret");
    tab.wait_for_element(".entry-body")
        .expect("decrypted body never rendered");

    let text = eval_str(&tab, r#"document.querySelector(".entry-body").textContent"#);
    assert!(text.contains("spare key hangs behind the boathouse door"), "body was {text}");
    let shell = eval_str(&tab, r#"String(document.getElementById("password-form"))"#);
    assert_eq!(shell, "null");
}

#[test]
#[ignore]
fn wrong_password_shows_generic_error_and_clears_input() {
    let tmp = TempDir::new().unwrap();
    let tab = open_page(&build_protected_site(tmp.path()));

    submit_password(&tab, "not-it");
    tab.wait_for_element("#password-error:not([hidden])")
        .expect("error never shown");

    let message = eval_str(&tab, r#"document.getElementById("password-error").textContent"#);
    assert_eq!(message.trim(), "Incorrect password");
    let value = eval_str(&tab, r#"document.getElementById("page-password").value"#);
    assert_eq!(value, "");
    let focused = eval_str(&tab, "document.activeElement.id");
    assert_eq!(focused, "page-password");
    let locked = eval_str(&tab, r#"String(document.querySelector(".entry-body"))"#);
    assert_eq!(locked, "null");

    // A later correct attempt still works.
    submit_password(&tab, "secret");
    tab.wait_for_element(".entry-body")
        .expect("decrypted body never rendered");
}
