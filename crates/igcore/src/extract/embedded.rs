//! Embedded-JSON strategy: pattern matchers run over the rendered markup.
//!
//! Instagram ships post data as JSON inside `<script>` tags. Rather than parse
//! those blobs (their shape changes often), each matcher looks for one known
//! key and lifts the URL next to it. Matchers form an ordered chain; the first
//! occurrence of a URL wins.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use super::decode::decode_escapes;
use crate::types::{MediaCandidate, MediaType};

/// One independent way of finding media URLs in markup.
pub trait MediaMatcher: Send + Sync {
    /// Short identifier used in debug logs
    fn name(&self) -> &str;

    fn media_type(&self) -> MediaType;

    /// Every decoded URL this matcher accepts, in document order.
    fn find_all(&self, markup: &str) -> Vec<String>;
}

/// Matcher backed by a regex whose first capture group is the URL.
pub struct RegexMatcher {
    name: &'static str,
    media_type: MediaType,
    pattern: Regex,
    accept: fn(&str) -> bool,
}

impl RegexMatcher {
    /// Build a matcher; returns `None` if `pattern` does not compile.
    pub fn new(name: &'static str, media_type: MediaType, pattern: &str) -> Option<Self> {
        let pattern = Regex::new(pattern).ok()?;
        Some(Self {
            name,
            media_type,
            pattern,
            accept: |_| true,
        })
    }

    /// Only keep decoded URLs for which `accept` returns true.
    pub fn accepting(mut self, accept: fn(&str) -> bool) -> Self {
        self.accept = accept;
        self
    }
}

impl MediaMatcher for RegexMatcher {
    fn name(&self) -> &str {
        self.name
    }

    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn find_all(&self, markup: &str) -> Vec<String> {
        self.pattern
            .captures_iter(markup)
            .filter_map(|caps| caps.get(1))
            .map(|m| decode_escapes(m.as_str()))
            .filter(|url| !url.is_empty() && (self.accept)(url))
            .collect()
    }
}

/// A decoded video match must still look like a video.
fn looks_like_video(url: &str) -> bool {
    url.contains(".mp4") || url.contains("video")
}

const VIDEO_PATTERNS: &[(&str, &str)] = &[
    ("video_url", r#""video_url"\s*:\s*"(https?:[^"]+)""#),
    ("playback_url", r#""playback_url"\s*:\s*"(https?:[^"]+)""#),
    (
        "video_versions",
        r#""video_versions"\s*:\s*\[\s*\{\s*[^}]*"url"\s*:\s*"(https?:[^"]+)""#,
    ),
    ("src_mp4", r#""src"\s*:\s*"(https?:[^"]+\.mp4[^"]*)""#),
    ("base_url_mp4", r#""baseURL"\s*:\s*"(https?:[^"]+\.mp4[^"]*)""#),
];

const IMAGE_PATTERNS: &[(&str, &str)] = &[
    ("display_url", r#""display_url"\s*:\s*"(https?:[^"]+)""#),
    ("display_src", r#""display_src"\s*:\s*"(https?:[^"]+)""#),
    ("candidates", r#""candidates"\s*:\s*\[\s*\{\s*"url"\s*:\s*"(https?:[^"]+)""#),
];

/// Ordered patterns for the cover image of a video.
const THUMBNAIL_PATTERNS: &[&str] = &[
    r#""thumbnail_src"\s*:\s*"(https?:[^"]+)""#,
    r#""poster"\s*:\s*"(https?:[^"]+)""#,
    r#""video_url"[^}]{0,500}"display_url"\s*:\s*"(https?:[^"]+)""#,
    r#""display_url"\s*:\s*"(https?:[^"]+)""#,
];

static THUMBNAIL_REGEXES: Lazy<Vec<Regex>> =
    Lazy::new(|| THUMBNAIL_PATTERNS.iter().filter_map(|p| Regex::new(p).ok()).collect());

/// Finds the cover image for video candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThumbnailLocator;

impl ThumbnailLocator {
    /// First pattern that matches wins.
    pub fn locate(&self, markup: &str) -> Option<String> {
        THUMBNAIL_REGEXES.iter().find_map(|re| {
            re.captures(markup)
                .and_then(|caps| caps.get(1))
                .map(|m| decode_escapes(m.as_str()))
                .filter(|url| !url.is_empty())
        })
    }
}

/// Chain of matchers plus the thumbnail locator.
pub struct EmbeddedJsonStrategy {
    matchers: Vec<Box<dyn MediaMatcher>>,
    thumbnails: ThumbnailLocator,
}

impl EmbeddedJsonStrategy {
    /// Empty chain; see [`EmbeddedJsonStrategy::default_chain`].
    pub fn new() -> Self {
        Self {
            matchers: Vec::new(),
            thumbnails: ThumbnailLocator,
        }
    }

    /// Video matchers first, then image matchers.
    pub fn default_chain() -> Self {
        let mut strategy = Self::new();
        for &(name, pattern) in VIDEO_PATTERNS {
            if let Some(m) = RegexMatcher::new(name, MediaType::Video, pattern) {
                strategy.push(m.accepting(looks_like_video));
            }
        }
        for &(name, pattern) in IMAGE_PATTERNS {
            if let Some(m) = RegexMatcher::new(name, MediaType::Image, pattern) {
                strategy.push(m);
            }
        }
        strategy
    }

    /// Append a matcher to the end of the chain.
    pub fn push(&mut self, matcher: impl MediaMatcher + 'static) -> &mut Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Run every matcher over `markup`. URLs are unique in the output.
    pub fn extract(&self, markup: &str) -> Vec<MediaCandidate> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        // Only look for a thumbnail if some video shows up
        let mut thumbnail: Option<Option<String>> = None;

        for matcher in &self.matchers {
            let found = matcher.find_all(markup);
            log::debug!("matcher {} found {} urls", matcher.name(), found.len());

            for url in found {
                if !seen.insert(url.clone()) {
                    continue;
                }
                let candidate = match matcher.media_type() {
                    MediaType::Video => {
                        let thumb = thumbnail.get_or_insert_with(|| self.thumbnails.locate(markup));
                        MediaCandidate::video(url, thumb.clone())
                    }
                    MediaType::Image => MediaCandidate::image(url),
                };
                out.push(candidate);
            }
        }

        out
    }
}

impl Default for EmbeddedJsonStrategy {
    fn default() -> Self {
        Self::default_chain()
    }
}
