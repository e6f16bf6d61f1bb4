//! Data model shared by every pipeline stage and by the HTTP layer.

use serde::{Deserialize, Serialize};

use crate::core::error::ExtractError;

/// What a candidate points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// A tentative media reference found during extraction.
///
/// Identity is the exact (case-sensitive) URL. Candidates are never mutated
/// after creation; stages build new sequences instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaCandidate {
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl MediaCandidate {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            media_type: MediaType::Image,
            url: url.into(),
            thumbnail: None,
        }
    }

    pub fn video(url: impl Into<String>, thumbnail: Option<String>) -> Self {
        Self {
            media_type: MediaType::Video,
            url: url.into(),
            thumbnail,
        }
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    pub fn is_image(&self) -> bool {
        self.media_type == MediaType::Image
    }
}

/// Kind of page a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Post,
    Reel,
    Story,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Post => "post",
            MediaKind::Reel => "reel",
            MediaKind::Story => "story",
        }
    }
}

/// Canonical identifier captured from the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Post, reel or tv shortcode
    Shortcode(String),
    /// Numeric story id
    Story(String),
}

/// A classified request. Derived once by the URL classifier; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub raw_url: String,
    pub kind: MediaKind,
    pub target: Target,
    /// Known up front only for stories
    pub username: Option<String>,
}

impl ExtractionRequest {
    pub fn shortcode(&self) -> Option<&str> {
        match &self.target {
            Target::Shortcode(code) => Some(code),
            Target::Story(_) => None,
        }
    }

    pub fn story_id(&self) -> Option<&str> {
        match &self.target {
            Target::Story(id) => Some(id),
            Target::Shortcode(_) => None,
        }
    }

    /// URL the browser is pointed at.
    pub fn canonical_url(&self) -> String {
        match (&self.kind, &self.target) {
            (MediaKind::Reel, Target::Shortcode(code)) => format!("https://www.instagram.com/reel/{}/", code),
            (_, Target::Shortcode(code)) => format!("https://www.instagram.com/p/{}/", code),
            (_, Target::Story(id)) => format!(
                "https://www.instagram.com/stories/{}/{}/",
                self.username.as_deref().unwrap_or_default(),
                id
            ),
        }
    }
}

/// Wire error codes understood by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUrl,
    NotFound,
    NoMedia,
    Error,
}

/// Terminal value of one request. Not persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    pub media: Vec<MediaCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_id: Option<String>,
}

impl ExtractionResult {
    pub fn success(media: Vec<MediaCandidate>, username: impl Into<String>) -> Self {
        Self {
            success: true,
            count: media.len(),
            media,
            username: Some(username.into()),
            code: None,
            error: None,
            story_id: None,
        }
    }

    pub fn failure(err: &ExtractError) -> Self {
        Self {
            success: false,
            media: Vec::new(),
            username: None,
            count: 0,
            code: Some(err.code()),
            error: Some(err.to_string()),
            story_id: None,
        }
    }

    pub fn with_story_id(mut self, story_id: Option<&str>) -> Self {
        self.story_id = story_id.map(String::from);
        self
    }
}
