//! Deduplication and noise filtering.

use std::collections::HashSet;

use crate::types::{MediaCandidate, MediaKind};

/// Substrings (matched on the lower-cased URL) that mark avatars and thumbnails
const THUMBNAIL_MARKERS: &[&str] = &[
    "150x150",
    "320x320",
    "640x640",
    "44x44",
    "s150x",
    "s320x",
    "_s.jpg",
    "profile",
    "profile_pic",
];

const CDN_MARKERS: &[&str] = &["scontent", "cdninstagram", "fbcdn"];

/// Drop duplicates and low-value images, keeping first occurrences in order.
///
/// Videos are never dropped for size markers. Outside stories, images must
/// come from an Instagram CDN host.
pub fn filter_candidates(candidates: Vec<MediaCandidate>, kind: MediaKind) -> Vec<MediaCandidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());

    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .filter(|c| !c.is_image() || keep_image(&c.url, kind))
        .collect()
}

fn keep_image(url: &str, kind: MediaKind) -> bool {
    let lower = url.to_lowercase();
    if THUMBNAIL_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    kind == MediaKind::Story || CDN_MARKERS.iter().any(|m| lower.contains(m))
}
