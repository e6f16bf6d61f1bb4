//! Render-driver abstraction layer.
//!
//! The pipeline never talks to a browser directly. It asks a `RenderDriver` for
//! an exclusive `PageSession`, drives it (cookies, navigation, markup, in-page
//! evaluation, response observation) and closes it. New backends are added by
//! implementing both traits.
//!
//! Built-in backends:
//! - `ChromiumDriver`: headless Chrome over CDP (`browser` feature)

pub mod chromium;
pub mod cookies;
#[cfg(feature = "browser")]
mod stealth;

pub use chromium::ChromiumDriver;
pub use cookies::SessionCookie;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::config;

/// Structured error type for driver operations.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Browser could not be started or connected to
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// Navigation failed (DNS, TLS, aborted load)
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// In-page script evaluation failed or returned an unexpected shape
    #[error("Evaluation failed: {0}")]
    Evaluation(String),
    /// Network observation could not be set up
    #[error("Interception failed: {0}")]
    Interception(String),
    /// An operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),
    /// The session was already closed
    #[error("Session closed")]
    Closed,
    /// Driver not available in this build
    #[error("Driver unavailable: {0}")]
    Unavailable(String),
}

impl DriverError {
    /// Returns subcategory for log lines
    pub fn subcategory(&self) -> &'static str {
        match self {
            DriverError::Launch(_) => "launch",
            DriverError::Navigation(_) => "navigation",
            DriverError::Evaluation(_) => "evaluation",
            DriverError::Interception(_) => "interception",
            DriverError::Timeout(_) => "timeout",
            DriverError::Closed => "closed",
            DriverError::Unavailable(_) => "unavailable",
        }
    }
}

/// A completed network response seen while a page loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    pub url: String,
    pub content_type: String,
    pub status: u16,
}

impl ObservedResponse {
    pub fn new(url: impl Into<String>, content_type: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
            status,
        }
    }
}

/// Receives responses synchronously, one at a time, as they are observed.
///
/// Implementations must decide accept/reject inside `observe`; nothing is queued
/// for later.
pub trait ResponseObserver {
    fn observe(&mut self, response: &ObservedResponse);
}

/// How a session should present itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProfile {
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub extra_headers: Vec<(String, String)>,
}

impl SessionProfile {
    fn desktop(viewport: (u32, u32)) -> Self {
        Self {
            viewport,
            user_agent: config::browser::USER_AGENT.to_string(),
            extra_headers: vec![
                ("Accept-Language".to_string(), config::browser::ACCEPT_LANGUAGE.to_string()),
                ("Accept".to_string(), config::browser::ACCEPT.to_string()),
            ],
        }
    }

    /// Profile for posts and reels
    pub fn post() -> Self {
        Self::desktop(config::browser::POST_VIEWPORT)
    }

    /// Profile for stories
    pub fn story() -> Self {
        Self::desktop(config::browser::STORY_VIEWPORT)
    }
}

/// Factory for exclusive page sessions.
///
/// Sessions share no mutable state; concurrent requests each open their own.
#[async_trait]
pub trait RenderDriver: Send + Sync {
    /// Human-readable name of this driver (e.g. "chromium")
    fn name(&self) -> &str;

    /// Open a fresh session. The caller owns it and must `close()` it.
    async fn open_session(&self, profile: &SessionProfile) -> Result<Box<dyn PageSession>, DriverError>;
}

/// One rendered page owned by a single request.
#[async_trait]
pub trait PageSession: Send {
    /// Inject cookies; must be called before navigation.
    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), DriverError>;

    /// Navigate and wait for the document to load.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Navigate while feeding every completed response to `observer`, then keep
    /// observing for `settle` after load. Observation stops when this returns.
    async fn navigate_observed(
        &mut self,
        url: &str,
        timeout: Duration,
        settle: Duration,
        observer: &mut (dyn ResponseObserver + Send),
    ) -> Result<(), DriverError>;

    /// Serialized markup of the current document.
    async fn content(&mut self) -> Result<String, DriverError>;

    /// Evaluate an expression in the document and return its JSON value.
    async fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, DriverError>;

    /// Release the session. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), DriverError>;
}
