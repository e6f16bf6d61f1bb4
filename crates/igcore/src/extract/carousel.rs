//! Carousel walking for multi-slide posts whose media is only in the DOM.
//!
//! The walker is a small state machine:
//!
//! ```text
//! Viewing(0) -> Advancing -> Viewing(1) -> ... -> Done
//! ```
//!
//! `Done` is reached when there is no usable "next" control or after
//! `max_advances` clicks.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use crate::core::config;
use crate::driver::{DriverError, PageSession};
use crate::types::MediaCandidate;

/// Clicks the "Next" control when it is present and displayed. Evaluates to a bool.
pub const ADVANCE_SCRIPT: &str = r#"(() => {
    const btn = document.querySelector('button[aria-label="Next"], button[aria-label="Berikutnya"]');
    if (btn && getComputedStyle(btn).display !== 'none') {
        btn.click();
        return true;
    }
    return false;
})()"#;

/// Lists the media elements of the post article. Evaluates to an array of
/// `{kind, srcset, src, renderedWidth}` objects.
pub const CURRENT_VIEW_SCRIPT: &str = r#"(() => {
    const out = [];
    const article = document.querySelector('article');
    if (!article) return out;
    for (const img of article.querySelectorAll('img[srcset]')) {
        out.push({
            kind: 'image',
            srcset: img.getAttribute('srcset'),
            renderedWidth: img.getBoundingClientRect().width
        });
    }
    for (const video of article.querySelectorAll('video')) {
        const source = video.querySelector('source');
        out.push({
            kind: 'video',
            src: video.src || (source ? source.src : null),
            renderedWidth: video.getBoundingClientRect().width
        });
    }
    return out;
})()"#;

/// Smallest rendered width (px) an image must exceed to count as a slide
const MIN_RENDERED_WIDTH: f64 = 150.0;

const SRCSET_THUMB_MARKERS: &[&str] = &["s150x150", "44x44"];

/// Raw media element as reported by the page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SlideElement {
    Image {
        #[serde(default)]
        srcset: Option<String>,
        #[serde(default, rename = "renderedWidth")]
        rendered_width: f64,
    },
    Video {
        #[serde(default)]
        src: Option<String>,
    },
}

impl SlideElement {
    /// The media this element contributes, if any.
    pub fn to_candidate(&self) -> Option<MediaCandidate> {
        match self {
            SlideElement::Image { srcset, rendered_width } => {
                let best = best_srcset_entry(srcset.as_deref()?)?;
                if SRCSET_THUMB_MARKERS.iter().any(|m| best.contains(m)) || *rendered_width <= MIN_RENDERED_WIDTH {
                    return None;
                }
                Some(MediaCandidate::image(best))
            }
            SlideElement::Video { src } => {
                let src = src.as_deref().filter(|s| !s.is_empty() && !s.starts_with("blob:"))?;
                Some(MediaCandidate::video(src, None))
            }
        }
    }
}

/// Widest entry of a `srcset`; on equal widths the later entry wins.
pub fn best_srcset_entry(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            Some((url, descriptor_width(parts.next().unwrap_or(""))))
        })
        .max_by_key(|(_, width)| *width)
        .map(|(url, _)| url)
}

/// Leading digits of a width descriptor (`1080w` -> 1080)
fn descriptor_width(descriptor: &str) -> u32 {
    let digits: String = descriptor.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// What the walker needs from a page.
#[async_trait]
pub trait SlideDeck: Send {
    /// Move to the next slide; `false` when there is none.
    async fn advance(&mut self) -> Result<bool, DriverError>;

    /// Media elements currently in view.
    async fn current_view(&mut self) -> Result<Vec<SlideElement>, DriverError>;
}

/// [`SlideDeck`] over a live page session.
pub struct PageSlideDeck<'a> {
    session: &'a mut dyn PageSession,
}

impl<'a> PageSlideDeck<'a> {
    pub fn new(session: &'a mut dyn PageSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<'a> SlideDeck for PageSlideDeck<'a> {
    async fn advance(&mut self) -> Result<bool, DriverError> {
        let value = self.session.evaluate(ADVANCE_SCRIPT).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn current_view(&mut self) -> Result<Vec<SlideElement>, DriverError> {
        let value = self.session.evaluate(CURRENT_VIEW_SCRIPT).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        let items = match value {
            serde_json::Value::Array(items) => items,
            other => return Err(DriverError::Evaluation(format!("expected slide array, got {}", other))),
        };
        // one odd element should not sink the whole view
        Ok(items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect())
    }
}

/// Walker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// Reading slide `i`
    Viewing(usize),
    /// Clicking "next" from slide `i`
    Advancing(usize),
    Done,
}

/// Result of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome {
    pub media: Vec<MediaCandidate>,
    pub slides_visited: usize,
    pub hit_ceiling: bool,
}

#[derive(Debug, Clone)]
pub struct CarouselWalker {
    max_advances: usize,
    settle: Duration,
}

impl CarouselWalker {
    pub fn new(max_advances: usize, settle: Duration) -> Self {
        Self { max_advances, settle }
    }

    /// Walk every slide of `deck`, merging media with URL dedup.
    pub async fn walk(&self, deck: &mut dyn SlideDeck) -> Result<WalkOutcome, DriverError> {
        let mut media = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut slides_visited = 0;
        let mut hit_ceiling = false;
        let mut state = WalkState::Viewing(0);

        loop {
            state = match state {
                WalkState::Viewing(i) => {
                    slides_visited += 1;
                    for element in deck.current_view().await? {
                        if let Some(candidate) = element.to_candidate() {
                            if seen.insert(candidate.url.clone()) {
                                media.push(candidate);
                            }
                        }
                    }
                    if i >= self.max_advances {
                        hit_ceiling = true;
                        WalkState::Done
                    } else {
                        WalkState::Advancing(i)
                    }
                }
                WalkState::Advancing(i) => {
                    if deck.advance().await? {
                        tokio::time::sleep(self.settle).await;
                        WalkState::Viewing(i + 1)
                    } else {
                        WalkState::Done
                    }
                }
                WalkState::Done => break,
            };
        }

        log::info!(
            "Carousel walk: {} slides, {} media{}",
            slides_visited,
            media.len(),
            if hit_ceiling { " (ceiling reached)" } else { "" }
        );

        Ok(WalkOutcome {
            media,
            slides_visited,
            hit_ceiling,
        })
    }
}

impl Default for CarouselWalker {
    fn default() -> Self {
        Self::new(config::carousel::MAX_ADVANCES, config::carousel::step_settle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Deck of fixed slides; `advance` fails once the last one is shown.
    struct ScriptedDeck {
        slides: Vec<Vec<SlideElement>>,
        position: usize,
        advances: usize,
    }

    impl ScriptedDeck {
        fn new(slides: Vec<Vec<SlideElement>>) -> Self {
            Self {
                slides,
                position: 0,
                advances: 0,
            }
        }
    }

    #[async_trait]
    impl SlideDeck for ScriptedDeck {
        async fn advance(&mut self) -> Result<bool, DriverError> {
            if self.position + 1 < self.slides.len() {
                self.position += 1;
                self.advances += 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn current_view(&mut self) -> Result<Vec<SlideElement>, DriverError> {
            Ok(self.slides[self.position].clone())
        }
    }

    fn image(url: &str) -> SlideElement {
        SlideElement::Image {
            srcset: Some(format!("{} 1080w", url)),
            rendered_width: 468.0,
        }
    }

    #[tokio::test]
    async fn test_three_advances_visit_four_slides() {
        let mut deck = ScriptedDeck::new(vec![
            vec![image("https://scontent.x/1.jpg")],
            vec![image("https://scontent.x/1.jpg"), image("https://scontent.x/2.jpg")],
            vec![image("https://scontent.x/3.jpg")],
            vec![SlideElement::Video {
                src: Some("https://scontent.x/4.mp4".into()),
            }],
        ]);
        let walker = CarouselWalker::new(20, Duration::ZERO);
        let outcome = walker.walk(&mut deck).await.unwrap();

        assert_eq!(deck.advances, 3);
        assert_eq!(outcome.slides_visited, 4);
        assert!(!outcome.hit_ceiling);
        let urls: Vec<&str> = outcome.media.iter().map(|m| m.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://scontent.x/1.jpg",
                "https://scontent.x/2.jpg",
                "https://scontent.x/3.jpg",
                "https://scontent.x/4.mp4"
            ]
        );
    }

    #[tokio::test]
    async fn test_ceiling_stops_walk() {
        let slides = (0..30).map(|i| vec![image(&format!("https://scontent.x/{}.jpg", i))]).collect();
        let mut deck = ScriptedDeck::new(slides);
        let outcome = CarouselWalker::new(5, Duration::ZERO).walk(&mut deck).await.unwrap();

        assert_eq!(deck.advances, 5);
        assert_eq!(outcome.slides_visited, 6);
        assert!(outcome.hit_ceiling);
        assert_eq!(outcome.media.len(), 6);
    }

    #[tokio::test]
    async fn test_single_slide() {
        let mut deck = ScriptedDeck::new(vec![vec![image("https://scontent.x/only.jpg")]]);
        let outcome = CarouselWalker::default().walk(&mut deck).await.unwrap();
        assert_eq!(outcome.slides_visited, 1);
        assert_eq!(outcome.media.len(), 1);
    }

    #[test]
    fn test_best_srcset_entry() {
        let srcset = "https://x/150.jpg 150w, https://x/640.jpg 640w, https://x/1080.jpg 1080w, https://x/750.jpg 750w";
        assert_eq!(best_srcset_entry(srcset), Some("https://x/1080.jpg"));
        assert_eq!(best_srcset_entry("https://x/a.jpg"), Some("https://x/a.jpg"));
        assert_eq!(best_srcset_entry(""), None);
    }

    #[test]
    fn test_slide_element_rules() {
        let thumb = SlideElement::Image {
            srcset: Some("https://x/s150x150/a.jpg 150w".into()),
            rendered_width: 500.0,
        };
        assert_eq!(thumb.to_candidate(), None);

        let tiny = SlideElement::Image {
            srcset: Some("https://x/a.jpg 1080w".into()),
            rendered_width: 150.0,
        };
        assert_eq!(tiny.to_candidate(), None);

        let blob = SlideElement::Video {
            src: Some("blob:https://www.instagram.com/1234".into()),
        };
        assert_eq!(blob.to_candidate(), None);
        assert_eq!(SlideElement::Video { src: None }.to_candidate(), None);
    }

    #[test]
    fn test_slide_element_deserializes_page_shape() {
        let items: Vec<SlideElement> = serde_json::from_value(json!([
            {"kind": "image", "srcset": "https://x/a.jpg 1080w", "renderedWidth": 468.5},
            {"kind": "video", "src": "https://x/v.mp4", "renderedWidth": 468}
        ]))
        .unwrap();
        assert_eq!(
            items[0],
            SlideElement::Image {
                srcset: Some("https://x/a.jpg 1080w".into()),
                rendered_width: 468.5
            }
        );
        assert_eq!(items[1].to_candidate(), Some(MediaCandidate::video("https://x/v.mp4", None)));
    }
}
