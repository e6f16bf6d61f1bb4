//! Post owner lookup from rendered markup.

use once_cell::sync::Lazy;
use regex::Regex;
use select::document::Document;
use select::predicate::{Attr, Name, Predicate};

/// Returned when no source names the owner
pub const UNKNOWN_USERNAME: &str = "unknown";

static PROFILE_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/[a-zA-Z0-9_.]+/?$").expect("profile href regex"));

static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([a-zA-Z0-9_.]+)").expect("mention regex"));

static OWNER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""owner"\s*:\s*\{\s*"id"\s*:\s*"[^"]+"\s*,\s*"username"\s*:\s*"([^"]+)""#).expect("owner regex")
});

/// Resolve the post owner, trying in order:
/// 1. the first profile link in the article header
/// 2. an `@mention` in `<title>`
/// 3. an `@mention` in `og:title`
/// 4. the `"owner"` object in embedded JSON
pub fn resolve_username(markup: &str) -> String {
    let document = Document::from(markup);

    from_header_link(&document)
        .or_else(|| from_title(&document))
        .or_else(|| from_og_title(&document))
        .or_else(|| from_owner_json(markup))
        .unwrap_or_else(|| UNKNOWN_USERNAME.to_string())
}

fn from_header_link(document: &Document) -> Option<String> {
    // Only the first root-relative link counts: later ones are usually commenters
    let href = document
        .find(Name("article").descendant(Name("header")).descendant(Name("a")))
        .filter_map(|node| node.attr("href"))
        .find(|href| href.starts_with('/'))?;

    if !PROFILE_HREF_RE.is_match(href) {
        return None;
    }
    let name = href.replace('/', "");
    (name.len() > 1).then_some(name)
}

fn mention(text: &str) -> Option<String> {
    MENTION_RE.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

fn from_title(document: &Document) -> Option<String> {
    let title = document.find(Name("title")).next()?.text();
    mention(&title)
}

fn from_og_title(document: &Document) -> Option<String> {
    let content = document
        .find(Name("meta").and(Attr("property", "og:title")))
        .next()?
        .attr("content")?;
    mention(content)
}

fn from_owner_json(markup: &str) -> Option<String> {
    OWNER_RE
        .captures(markup)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
