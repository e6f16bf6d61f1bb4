//! Request orchestration: classify, open a session, run the per-kind flow,
//! always close the session, and turn every outcome into an `ExtractionResult`.

use std::sync::Arc;
use std::time::Duration;

use crate::core::config;
use crate::core::error::ExtractError;
use crate::driver::{DriverError, PageSession, RenderDriver, SessionCookie, SessionProfile};
use crate::extract::{
    classify, filter_candidates, merge, resolve_username, select_media, CandidateExtractor, CarouselWalker,
    ExtractionSource, NetworkCapture, PageSlideDeck,
};
use crate::types::{ExtractionRequest, ExtractionResult, MediaCandidate, MediaKind};

/// Markup fragments the site renders for missing or removed posts
const NOT_FOUND_MARKERS: &[&str] = &["Page Not Found", "Sorry, this page isn't available"];

const POST_NO_MEDIA: &str = "Could not find media. The post may be private or unavailable.";
const STORY_NO_MEDIA: &str = "No media found. Story may require login or has expired.";
const STORY_NO_USABLE_MEDIA: &str = "No usable media found.";

/// Timing knobs for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeOptions {
    /// Deadline for a single navigation
    pub navigation_timeout: Duration,
    /// Deadline for the whole request, session setup included
    pub request_timeout: Duration,
    pub post_settle: Duration,
    pub story_settle: Duration,
    pub carousel_max_advances: usize,
    pub carousel_settle: Duration,
    pub capture_capacity: usize,
    /// Bound on releasing the session
    pub close_timeout: Duration,
}

impl ScrapeOptions {
    /// Values from the environment and the constant groups in `config`.
    pub fn from_env() -> Self {
        Self {
            navigation_timeout: config::operation_timeout(),
            request_timeout: config::request_timeout(),
            post_settle: config::extraction::post_settle(),
            story_settle: config::extraction::story_settle(),
            carousel_max_advances: config::carousel::MAX_ADVANCES,
            carousel_settle: config::carousel::step_settle(),
            capture_capacity: config::capture::MAX_CAPTURED,
            close_timeout: config::browser::close_timeout(),
        }
    }

    /// No waits at all; for tests against scripted sessions.
    pub fn instant() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            post_settle: Duration::ZERO,
            story_settle: Duration::ZERO,
            carousel_max_advances: config::carousel::MAX_ADVANCES,
            carousel_settle: Duration::ZERO,
            capture_capacity: config::capture::MAX_CAPTURED,
            close_timeout: Duration::from_secs(1),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Entry point of the extraction pipeline.
///
/// Holds no per-request state; one `Extractor` serves concurrent requests,
/// each on its own page session.
pub struct Extractor {
    driver: Arc<dyn RenderDriver>,
    options: ScrapeOptions,
    cookies: Vec<SessionCookie>,
    candidates: CandidateExtractor,
}

impl Extractor {
    pub fn new(driver: Arc<dyn RenderDriver>, options: ScrapeOptions) -> Self {
        Self {
            driver,
            options,
            cookies: Vec::new(),
            candidates: CandidateExtractor::default(),
        }
    }

    /// Cookies injected when a request brings none of its own.
    pub fn with_cookies(mut self, cookies: Vec<SessionCookie>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn with_candidate_extractor(mut self, candidates: CandidateExtractor) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn options(&self) -> &ScrapeOptions {
        &self.options
    }

    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// Extract media for `url`. Never fails: errors come back as an
    /// unsuccessful result carrying a wire code.
    ///
    /// `cookies` override the extractor's default cookies when non-empty.
    pub async fn extract(&self, url: &str, cookies: Option<&[SessionCookie]>) -> ExtractionResult {
        let request = match classify(url) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Rejected URL {:?}: {}", url, e);
                return ExtractionResult::failure(&e);
            }
        };

        log::info!(
            "Processing {} {}",
            request.kind.as_str(),
            request.shortcode().or(request.story_id()).unwrap_or_default()
        );

        match self.run(&request, cookies).await {
            Ok(result) => {
                log::info!("Extracted {} media for {}", result.count, request.raw_url);
                result
            }
            Err(e) => {
                log::warn!("Extraction failed for {} [{}]: {}", request.raw_url, e.subcategory(), e);
                ExtractionResult::failure(&e)
            }
        }
    }

    async fn run(
        &self,
        request: &ExtractionRequest,
        cookies: Option<&[SessionCookie]>,
    ) -> Result<ExtractionResult, ExtractError> {
        let profile = match request.kind {
            MediaKind::Story => SessionProfile::story(),
            MediaKind::Post | MediaKind::Reel => SessionProfile::post(),
        };
        let cookies = match cookies {
            Some(c) if !c.is_empty() => c,
            _ => self.cookies.as_slice(),
        };

        let mut session = self.driver.open_session(&profile).await?;

        let outcome = tokio::time::timeout(self.options.request_timeout, self.drive(session.as_mut(), request, cookies))
            .await
            .unwrap_or_else(|_| {
                Err(ExtractError::Transport(DriverError::Timeout(format!(
                    "request exceeded {:?}",
                    self.options.request_timeout
                ))))
            });

        match tokio::time::timeout(self.options.close_timeout, session.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Session close failed: {}", e),
            Err(_) => log::warn!("Session close exceeded {:?}, dropping it", self.options.close_timeout),
        }

        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn PageSession,
        request: &ExtractionRequest,
        cookies: &[SessionCookie],
    ) -> Result<ExtractionResult, ExtractError> {
        if cookies.is_empty() {
            log::info!("No session cookies{}", if request.kind == MediaKind::Story { ", stories may not load" } else { "" });
        } else {
            session.set_cookies(cookies).await?;
        }

        match request.kind {
            MediaKind::Story => self.extract_story(session, request).await,
            MediaKind::Post | MediaKind::Reel => self.extract_post(session, request).await,
        }
    }

    async fn extract_post(
        &self,
        session: &mut dyn PageSession,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        let kind = request.kind;
        session
            .navigate(&request.canonical_url(), self.options.navigation_timeout)
            .await?;
        tokio::time::sleep(self.options.post_settle).await;

        let markup = session.content().await?;
        if NOT_FOUND_MARKERS.iter().any(|m| markup.contains(m)) {
            return Err(ExtractError::NotFound("Post not found".to_string()));
        }

        let username = resolve_username(&markup);
        log::debug!("Owner: {}", username);

        let embedded = self.candidates.extract(ExtractionSource::Document(&markup));
        let mut media = select_media(filter_candidates(embedded, kind), kind);

        if media.is_empty() && kind != MediaKind::Reel {
            log::info!("No embedded media, walking carousel");
            let walker = CarouselWalker::new(self.options.carousel_max_advances, self.options.carousel_settle);
            let outcome = walker.walk(&mut PageSlideDeck::new(session)).await?;
            media = select_media(filter_candidates(outcome.media, kind), kind);
        }

        if media.is_empty() {
            return Err(ExtractError::NoMedia(POST_NO_MEDIA.to_string()));
        }
        Ok(ExtractionResult::success(media, username))
    }

    async fn extract_story(
        &self,
        session: &mut dyn PageSession,
        request: &ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractError> {
        let mut capture = NetworkCapture::with_capacity(self.options.capture_capacity);
        session
            .navigate_observed(
                &request.canonical_url(),
                self.options.navigation_timeout,
                self.options.story_settle,
                &mut capture,
            )
            .await?;
        log::info!("Captured {} story responses", capture.len());

        // login walls are not checked: capture may already hold the media
        let markup = session.content().await?;
        let embedded = self.candidates.extract(ExtractionSource::Document(&markup));
        let found: Vec<MediaCandidate> = merge([capture.into_candidates(), embedded]);
        if found.is_empty() {
            return Err(ExtractError::NoMedia(STORY_NO_MEDIA.to_string()));
        }

        let media = select_media(filter_candidates(found, MediaKind::Story), MediaKind::Story);
        if media.is_empty() {
            return Err(ExtractError::NoMedia(STORY_NO_USABLE_MEDIA.to_string()));
        }

        let username = request.username.clone().unwrap_or_default();
        Ok(ExtractionResult::success(media, username).with_story_id(request.story_id()))
    }
}
