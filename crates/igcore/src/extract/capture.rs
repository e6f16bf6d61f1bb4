//! Network-interception strategy for stories.
//!
//! Story media is fetched by page scripts after load and never shows up in
//! the initial markup, so candidates are taken from the responses themselves.

use std::collections::HashSet;

use crate::core::config;
use crate::driver::{ObservedResponse, ResponseObserver};
use crate::types::{MediaCandidate, MediaType};

const VIDEO_HOST_TOKENS: &[&str] = &["fbcdn.net", "cdninstagram", "instagram.com"];

const STORY_PATH_MARKERS: &[&str] = &["/v/t51", "/v/t39", "/v/t1."];

const IMAGE_BLOCKLIST: &[&str] = &[
    "rsrc.php",
    "/rsrc",
    "static.",
    "44x44",
    "150x150",
    "profile_pic",
    "s150x",
    "s320x",
];

/// Why a response was not captured. Logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ErrorStatus,
    NotMedia,
    NotFromCdn,
    TooShort,
    NotStoryPath,
    Blocklisted,
}

/// Decide whether one response is story media.
///
/// The video and image rules are independent: a response that fails the
/// video rule may still be captured as an image.
pub fn classify_response(response: &ObservedResponse) -> Result<MediaType, Rejection> {
    if response.status >= 400 {
        return Err(Rejection::ErrorStatus);
    }

    let url = response.url.as_str();
    let content_type = response.content_type.to_ascii_lowercase();

    let video = if url.contains(".mp4") || content_type.contains("video/") {
        video_rule(url)
    } else {
        Err(Rejection::NotMedia)
    };
    if video.is_ok() || !content_type.contains("image/") {
        return video;
    }
    image_rule(url)
}

fn video_rule(url: &str) -> Result<MediaType, Rejection> {
    if !VIDEO_HOST_TOKENS.iter().any(|t| url.contains(t)) {
        return Err(Rejection::NotFromCdn);
    }
    if url.len() <= config::capture::VIDEO_URL_MIN_LEN {
        return Err(Rejection::TooShort);
    }
    Ok(MediaType::Video)
}

fn image_rule(url: &str) -> Result<MediaType, Rejection> {
    let from_cdn = url.contains("scontent") || (url.contains("fbcdn.net") && url.contains("/v/"));
    if !from_cdn {
        return Err(Rejection::NotFromCdn);
    }
    if !STORY_PATH_MARKERS.iter().any(|m| url.contains(m)) {
        return Err(Rejection::NotStoryPath);
    }
    if IMAGE_BLOCKLIST.iter().any(|b| url.contains(b)) {
        return Err(Rejection::Blocklisted);
    }
    if url.len() < config::capture::IMAGE_URL_MIN_LEN {
        return Err(Rejection::TooShort);
    }
    Ok(MediaType::Image)
}

/// Bounded accumulator fed by the driver while a story page loads.
///
/// Lives for one navigation. Duplicates are dropped at insertion and, once
/// `capacity` candidates are held, further matches are discarded.
#[derive(Debug)]
pub struct NetworkCapture {
    captured: Vec<MediaCandidate>,
    seen: HashSet<String>,
    capacity: usize,
    overflowed: usize,
}

impl NetworkCapture {
    pub fn new() -> Self {
        Self::with_capacity(config::capture::MAX_CAPTURED)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            captured: Vec::new(),
            seen: HashSet::new(),
            capacity,
            overflowed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    /// Matches dropped because the capture was full
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }

    pub fn candidates(&self) -> &[MediaCandidate] {
        &self.captured
    }

    pub fn into_candidates(self) -> Vec<MediaCandidate> {
        self.captured
    }
}

impl Default for NetworkCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseObserver for NetworkCapture {
    fn observe(&mut self, response: &ObservedResponse) {
        let media_type = match classify_response(response) {
            Ok(media_type) => media_type,
            Err(reason) => {
                log::debug!("capture skip {:?}: {}", reason, truncate(&response.url));
                return;
            }
        };

        if self.seen.contains(&response.url) {
            return;
        }
        if self.captured.len() >= self.capacity {
            self.overflowed += 1;
            log::warn!("Capture full ({}), dropping {}", self.capacity, truncate(&response.url));
            return;
        }

        log::info!("Captured {:?}: {}", media_type, truncate(&response.url));
        self.seen.insert(response.url.clone());
        self.captured.push(match media_type {
            MediaType::Video => MediaCandidate::video(response.url.clone(), None),
            MediaType::Image => MediaCandidate::image(response.url.clone()),
        });
    }
}

fn truncate(url: &str) -> &str {
    match url.char_indices().nth(120) {
        Some((idx, _)) => &url[..idx],
        None => url,
    }
}
