//! Markdown fragment resolution.
//!
//! Layer panels and glossary entries are authored as markdown files under
//! the texts root. A fragment is an optional front-matter block (delimited
//! by `---` lines) followed by a body:
//!
//! ```text
//! ---
//! title: "The warp and the weft"
//! ---
//! Weaving interlaces two thread systems...
//! ```
//!
//! [`resolve`] turns a logical path from a spreadsheet cell into a
//! [`Fragment`]: the front-matter `title` (empty string when absent, never
//! null) and the body rendered to HTML. Rendering keeps raw HTML passthrough
//! and treats single newlines as line breaks, matching how curators write
//! panel text.

use pulldown_cmark::{Event, Options, Parser, html};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Front-matter delimiter line.
pub const FRONT_MATTER_DELIMITER: &str = "---";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^title:\s*(.+)\s*$"#).expect("static regex"));

/// A resolved markdown fragment, ready for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Front-matter title; `""` when the fragment has none.
    pub title: String,
    /// Body rendered to HTML.
    pub content: String,
}

/// Resolve a logical path to a fragment under the texts root.
///
/// Returns `Ok(None)` when the file does not exist — the caller decides the
/// fallback (for layers: the missing-content sentinel and callout). A
/// logical path without an extension gets `.md` appended.
pub fn resolve(texts_root: &Path, logical_path: &str) -> Result<Option<Fragment>, std::io::Error> {
    let path = fragment_path(texts_root, logical_path);
    let raw = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let (front_matter, body) = split_front_matter(&raw);
    let title = front_matter.map(extract_title).unwrap_or_default();
    Ok(Some(Fragment {
        title,
        content: render_body(body),
    }))
}

/// Filesystem path for a logical fragment path.
pub fn fragment_path(texts_root: &Path, logical_path: &str) -> PathBuf {
    let mut path = texts_root.join(logical_path.trim());
    if path.extension().is_none() {
        path.set_extension("md");
    }
    path
}

/// Split text into an optional front-matter block and the body.
///
/// Front matter requires a `---` line at the very start and a closing `---`
/// line; anything else is all body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FRONT_MATTER_DELIMITER {
            let front = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(front), body);
        }
        offset += line.len();
    }
    // Unterminated front matter: treat the whole text as body.
    (None, text)
}

/// First `title:` value in a front-matter block, quotes stripped.
fn extract_title(front_matter: &str) -> String {
    TITLE_RE
        .captures(front_matter)
        .map(|caps| {
            caps[1]
                .trim()
                .trim_matches('"')
                .trim_matches('\'')
                .to_string()
        })
        .unwrap_or_default()
}

/// Render a markdown body to HTML.
///
/// Raw HTML passes through untouched (pulldown-cmark default) and soft
/// breaks are promoted to hard breaks so a single newline in panel text
/// becomes a visible line break.
pub fn render_body(body: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(body.trim(), options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}
