//! URL classification: decides the request kind before any I/O happens.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::core::error::ExtractError;
use crate::types::{ExtractionRequest, MediaKind, Target};

const ALLOWED_HOSTS: &[&str] = &["instagram.com", "www.instagram.com", "m.instagram.com"];

/// Path prefixes that carry a shortcode
const CONTENT_TYPES: &[&str] = &["p", "reel", "reels", "tv"];

static SHORTCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("shortcode regex"));

static STORY_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("story id regex"));

const INVALID_POST_URL: &str = "Invalid URL. Please enter a valid Instagram post, reel or story URL.";

/// Classify a raw URL into an [`ExtractionRequest`].
///
/// Accepted shapes (any of the Instagram hosts, scheme optional):
/// - `/p/<code>`, `/reel/<code>`, `/reels/<code>`, `/tv/<code>`, optionally behind `/<username>/`
/// - `/stories/<username>/<digits>`
pub fn classify(raw_url: &str) -> Result<ExtractionRequest, ExtractError> {
    let trimmed = raw_url.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidUrl("URL is required".to_string()));
    }

    let url = parse_lenient(trimmed).ok_or_else(|| ExtractError::InvalidUrl(INVALID_POST_URL.to_string()))?;

    let host = url.host_str().map(|h| h.to_ascii_lowercase()).unwrap_or_default();
    if !ALLOWED_HOSTS.contains(&host.as_str()) {
        return Err(ExtractError::InvalidUrl(INVALID_POST_URL.to_string()));
    }

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.first() == Some(&"stories") {
        return classify_story(trimmed, &segments);
    }

    let (prefix, code) = content_segments(&segments).ok_or_else(|| ExtractError::InvalidUrl(INVALID_POST_URL.to_string()))?;
    if !SHORTCODE_RE.is_match(code) {
        return Err(ExtractError::InvalidUrl("Shortcode not found".to_string()));
    }

    let kind = if prefix.starts_with("reel") {
        MediaKind::Reel
    } else {
        MediaKind::Post
    };

    Ok(ExtractionRequest {
        raw_url: trimmed.to_string(),
        kind,
        target: Target::Shortcode(code.to_string()),
        username: None,
    })
}

fn parse_lenient(raw: &str) -> Option<Url> {
    if raw.contains("://") {
        Url::parse(raw).ok()
    } else {
        Url::parse(&format!("https://{}", raw)).ok()
    }
}

/// `(content type, shortcode)` for `/<type>/<code>` and `/<username>/<type>/<code>`.
fn content_segments<'a>(segments: &[&'a str]) -> Option<(&'a str, &'a str)> {
    if segments.len() >= 2 && CONTENT_TYPES.contains(&segments[0]) {
        return Some((segments[0], segments[1]));
    }
    if segments.len() >= 3 && CONTENT_TYPES.contains(&segments[1]) {
        return Some((segments[1], segments[2]));
    }
    None
}

fn classify_story(raw_url: &str, segments: &[&str]) -> Result<ExtractionRequest, ExtractError> {
    match segments {
        [_, username, story_id, ..] if STORY_ID_RE.is_match(story_id) => Ok(ExtractionRequest {
            raw_url: raw_url.to_string(),
            kind: MediaKind::Story,
            target: Target::Story((*story_id).to_string()),
            username: Some((*username).to_string()),
        }),
        _ => Err(ExtractError::InvalidUrl("Invalid story URL".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_post() {
        let request = classify("https://www.instagram.com/p/ABC123/").unwrap();
        assert_eq!(request.kind, MediaKind::Post);
        assert_eq!(request.shortcode(), Some("ABC123"));
        assert_eq!(request.username, None);
    }

    #[test]
    fn test_classify_reel_variants() {
        for url in [
            "https://www.instagram.com/reel/Cx_y-9/",
            "https://instagram.com/reels/Cx_y-9",
            "https://www.instagram.com/someone/reel/Cx_y-9/?igsh=abc",
        ] {
            let request = classify(url).unwrap();
            assert_eq!(request.kind, MediaKind::Reel, "{}", url);
            assert_eq!(request.shortcode(), Some("Cx_y-9"));
        }
    }

    #[test]
    fn test_classify_tv_is_post() {
        let request = classify("https://m.instagram.com/tv/XYZ/").unwrap();
        assert_eq!(request.kind, MediaKind::Post);
        assert_eq!(request.canonical_url(), "https://www.instagram.com/p/XYZ/");
    }

    #[test]
    fn test_classify_without_scheme() {
        let request = classify("instagram.com/p/ABC/").unwrap();
        assert_eq!(request.shortcode(), Some("ABC"));
    }

    #[test]
    fn test_classify_story() {
        let request = classify("https://www.instagram.com/stories/nasa/3141592653589793/").unwrap();
        assert_eq!(request.kind, MediaKind::Story);
        assert_eq!(request.story_id(), Some("3141592653589793"));
        assert_eq!(request.username.as_deref(), Some("nasa"));
    }

    #[test]
    fn test_classify_rejects() {
        for url in [
            "",
            "   ",
            "https://example.com/p/ABC/",
            "https://www.instagram.com/nasa/",
            "https://www.instagram.com/p/",
            "https://www.instagram.com/stories/nasa/",
            "https://www.instagram.com/stories/nasa/notanumber/",
            "https://www.instagram.com/p/AB%20C/",
            "not a url at all",
        ] {
            let err = classify(url).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidUrl(_)), "{}", url);
        }
    }
}
