//! Final selection per request kind.

use crate::types::{MediaCandidate, MediaKind};

/// Quality hint preserved from the site's URL scheme: full-size story frames
/// carry their 1080 width in the path.
const PREFERRED_MARKER: &str = "1080";

/// Pick what is returned for `kind`.
///
/// - reel: only the videos when there are any, otherwise unchanged
/// - story: the first video, else the best ranked image, else nothing
/// - post: unchanged
pub fn select_media(candidates: Vec<MediaCandidate>, kind: MediaKind) -> Vec<MediaCandidate> {
    match kind {
        MediaKind::Post => candidates,
        MediaKind::Reel => {
            if candidates.iter().any(MediaCandidate::is_video) {
                candidates.into_iter().filter(MediaCandidate::is_video).collect()
            } else {
                candidates
            }
        }
        MediaKind::Story => select_story(candidates).into_iter().collect(),
    }
}

fn select_story(candidates: Vec<MediaCandidate>) -> Option<MediaCandidate> {
    let (videos, mut images): (Vec<_>, Vec<_>) = candidates.into_iter().partition(MediaCandidate::is_video);
    if let Some(video) = videos.into_iter().next() {
        return Some(video);
    }
    // stable: ties keep capture order
    images.sort_by_key(|img| !img.url.contains(PREFERRED_MARKER));
    images.into_iter().next()
}
