//! Scripted `RenderDriver` that serves canned pages.
//!
//! Pages are keyed by the exact URL the pipeline navigates to. Carousel
//! slides answer the walker's in-page scripts; every other expression
//! evaluates to `null`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::driver::{
    DriverError, ObservedResponse, PageSession, RenderDriver, ResponseObserver, SessionCookie, SessionProfile,
};
use crate::extract::carousel::{ADVANCE_SCRIPT, CURRENT_VIEW_SCRIPT};

/// One canned page.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub markup: String,
    /// Fed to the observer on `navigate_observed`, in order
    pub responses: Vec<ObservedResponse>,
    /// Carousel views as the page script would report them
    pub slides: Vec<Vec<serde_json::Value>>,
    /// Navigation fails with this message
    pub navigate_error: Option<String>,
    /// Navigation takes this long before succeeding
    pub navigate_delay: Duration,
}

impl ScriptedPage {
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Default::default()
        }
    }

    pub fn with_responses(mut self, responses: Vec<ObservedResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_slides(mut self, slides: Vec<Vec<serde_json::Value>>) -> Self {
        self.slides = slides;
        self
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            navigate_error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }
}

/// Counters shared between a driver and its sessions.
#[derive(Debug, Default)]
pub struct MockDriverStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    cookies_set: AtomicUsize,
    advances: AtomicUsize,
    profiles: Mutex<Vec<SessionProfile>>,
    navigations: Mutex<Vec<String>>,
}

impl MockDriverStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sessions opened but not closed
    pub fn open_now(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }

    pub fn cookies_set(&self) -> usize {
        self.cookies_set.load(Ordering::SeqCst)
    }

    /// Successful "next" clicks across all sessions
    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }

    pub fn profiles(&self) -> Vec<SessionProfile> {
        self.profiles.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().map(|n| n.clone()).unwrap_or_default()
    }
}

/// Driver serving [`ScriptedPage`]s.
#[derive(Debug, Default)]
pub struct MockDriver {
    pages: HashMap<String, ScriptedPage>,
    fail_open: Option<String>,
    close_delay: Duration,
    stats: Arc<MockDriverStats>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, page: ScriptedPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Every `open_session` fails with a launch error.
    pub fn failing_launch(mut self, message: impl Into<String>) -> Self {
        self.fail_open = Some(message.into());
        self
    }

    /// Every `close` takes this long, like a browser that will not exit.
    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<MockDriverStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl RenderDriver for MockDriver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_session(&self, profile: &SessionProfile) -> Result<Box<dyn PageSession>, DriverError> {
        if let Some(message) = &self.fail_open {
            return Err(DriverError::Launch(message.clone()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut profiles) = self.stats.profiles.lock() {
            profiles.push(profile.clone());
        }
        Ok(Box::new(MockSession {
            pages: self.pages.clone(),
            current: None,
            slide: 0,
            closed: false,
            close_delay: self.close_delay,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MockSession {
    pages: HashMap<String, ScriptedPage>,
    current: Option<ScriptedPage>,
    slide: usize,
    closed: bool,
    close_delay: Duration,
    stats: Arc<MockDriverStats>,
}

impl MockSession {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            Err(DriverError::Closed)
        } else {
            Ok(())
        }
    }

    async fn load(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()?;
        if let Ok(mut navigations) = self.stats.navigations.lock() {
            navigations.push(url.to_string());
        }

        // unknown URLs render an empty document
        let page = self.pages.get(url).cloned().unwrap_or_default();
        if page.navigate_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(DriverError::Timeout(format!("navigation to {}", url)));
        }
        tokio::time::sleep(page.navigate_delay).await;
        if let Some(message) = &page.navigate_error {
            return Err(DriverError::Navigation(message.clone()));
        }

        self.current = Some(page);
        self.slide = 0;
        Ok(())
    }

    fn page(&self) -> Result<&ScriptedPage, DriverError> {
        self.ensure_open()?;
        self.current
            .as_ref()
            .ok_or_else(|| DriverError::Evaluation("no document loaded".to_string()))
    }
}

#[async_trait]
impl PageSession for MockSession {
    async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), DriverError> {
        self.ensure_open()?;
        self.stats.cookies_set.fetch_add(cookies.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.load(url, timeout).await
    }

    async fn navigate_observed(
        &mut self,
        url: &str,
        timeout: Duration,
        settle: Duration,
        observer: &mut (dyn ResponseObserver + Send),
    ) -> Result<(), DriverError> {
        self.load(url, timeout).await?;
        for response in &self.page()?.responses {
            observer.observe(response);
        }
        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn content(&mut self) -> Result<String, DriverError> {
        Ok(self.page()?.markup.clone())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, DriverError> {
        let slides = self.page()?.slides.len();
        if expression == ADVANCE_SCRIPT {
            if self.slide + 1 < slides {
                self.slide += 1;
                self.stats.advances.fetch_add(1, Ordering::SeqCst);
                return Ok(serde_json::Value::Bool(true));
            }
            return Ok(serde_json::Value::Bool(false));
        }
        if expression == CURRENT_VIEW_SCRIPT {
            let view = self.page()?.slides.get(self.slide).cloned().unwrap_or_default();
            return Ok(serde_json::Value::Array(view));
        }
        Ok(serde_json::Value::Null)
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        tokio::time::sleep(self.close_delay).await;
        if !self.closed {
            self.closed = true;
            self.current = None;
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
