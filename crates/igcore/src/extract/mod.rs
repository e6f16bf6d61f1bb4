//! Media extraction stages.
//!
//! Leaves first:
//! - `classify`: URL to [`ExtractionRequest`](crate::types::ExtractionRequest)
//! - `embedded` / `capture`: candidate strategies (markup, network responses)
//! - `filter`: dedup and noise removal
//! - `rank`: per-kind selection
//! - `carousel`: slide walking for posts with no embedded data
//! - `username`: post owner lookup

pub mod capture;
pub mod carousel;
pub mod classify;
pub mod decode;
pub mod embedded;
pub mod filter;
pub mod rank;
pub mod username;

pub use capture::NetworkCapture;
pub use carousel::{CarouselWalker, PageSlideDeck, SlideDeck, SlideElement, WalkOutcome, WalkState};
pub use classify::classify;
pub use decode::decode_escapes;
pub use embedded::{EmbeddedJsonStrategy, MediaMatcher, RegexMatcher, ThumbnailLocator};
pub use filter::filter_candidates;
pub use rank::select_media;
pub use username::resolve_username;

use std::collections::HashSet;

use crate::driver::{ObservedResponse, ResponseObserver};
use crate::types::MediaCandidate;

/// Where candidates come from.
#[derive(Debug, Clone, Copy)]
pub enum ExtractionSource<'a> {
    /// Serialized page markup
    Document(&'a str),
    /// Responses recorded during navigation
    Responses(&'a [ObservedResponse]),
}

/// Runs the strategy matching each source.
#[derive(Default)]
pub struct CandidateExtractor {
    embedded: EmbeddedJsonStrategy,
}

impl CandidateExtractor {
    pub fn new(embedded: EmbeddedJsonStrategy) -> Self {
        Self { embedded }
    }

    /// Candidates from one source. URLs are unique in the output.
    pub fn extract(&self, source: ExtractionSource<'_>) -> Vec<MediaCandidate> {
        match source {
            ExtractionSource::Document(markup) => self.embedded.extract(markup),
            ExtractionSource::Responses(responses) => {
                let mut capture = NetworkCapture::new();
                for response in responses {
                    capture.observe(response);
                }
                capture.into_candidates()
            }
        }
    }
}

/// Concatenate candidate lists, keeping the first occurrence of each URL.
pub fn merge(lists: impl IntoIterator<Item = Vec<MediaCandidate>>) -> Vec<MediaCandidate> {
    let mut seen: HashSet<String> = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}
