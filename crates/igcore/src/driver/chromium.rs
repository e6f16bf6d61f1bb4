//! Headless Chrome driver over the DevTools protocol.
//!
//! Every session launches its own browser process so concurrent requests share
//! nothing. The real implementation lives behind the `browser` feature; builds
//! without it keep the type so callers compile, but `open_session` fails with
//! [`DriverError::Unavailable`].

use async_trait::async_trait;

use super::{DriverError, PageSession, RenderDriver, SessionProfile};

/// Launch options for [`ChromiumDriver`].
#[derive(Debug, Clone)]
pub struct ChromiumDriver {
    headless: bool,
    chrome_path: Option<String>,
}

impl ChromiumDriver {
    pub fn new(headless: bool, chrome_path: Option<String>) -> Self {
        Self { headless, chrome_path }
    }

    /// Driver configured from `HEADLESS` / `CHROME_PATH`
    pub fn from_env() -> Self {
        Self::new(*crate::core::config::HEADLESS, crate::core::config::CHROME_PATH.clone())
    }

    pub fn headless(&self) -> bool {
        self.headless
    }

    pub fn chrome_path(&self) -> Option<&str> {
        self.chrome_path.as_deref()
    }
}

impl Default for ChromiumDriver {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl RenderDriver for ChromiumDriver {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open_session(&self, _profile: &SessionProfile) -> Result<Box<dyn PageSession>, DriverError> {
        Err(DriverError::Unavailable(
            "built without the `browser` feature".to_string(),
        ))
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl RenderDriver for ChromiumDriver {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open_session(&self, profile: &SessionProfile) -> Result<Box<dyn PageSession>, DriverError> {
        let session = cdp::ChromiumSession::launch(self, profile).await?;
        Ok(Box::new(session))
    }
}

#[cfg(feature = "browser")]
mod cdp {
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
    use chromiumoxide::cdp::browser_protocol::network::{
        CookieParam, EnableParams, EventResponseReceived, Headers, SetExtraHttpHeadersParams,
        SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures_util::StreamExt;
    use tokio::task::JoinHandle;

    use super::ChromiumDriver;
    use crate::core::config;
    use crate::driver::stealth::{LAUNCH_ARGS, STEALTH_SCRIPTS};
    use crate::driver::{
        DriverError, ObservedResponse, PageSession, ResponseObserver, SessionCookie, SessionProfile,
    };

    pub(super) struct ChromiumSession {
        browser: Option<Browser>,
        page: Option<Page>,
        handler: Option<JoinHandle<()>>,
    }

    impl ChromiumSession {
        pub(super) async fn launch(driver: &ChromiumDriver, profile: &SessionProfile) -> Result<Self, DriverError> {
            let (width, height) = profile.viewport;
            let mut builder = BrowserConfig::builder().window_size(width, height);

            if let Some(path) = driver.chrome_path() {
                builder = builder.chrome_executable(path);
            }
            // with_head means NOT headless
            if !driver.headless() {
                builder = builder.with_head();
            }
            for arg in LAUNCH_ARGS {
                builder = builder.arg(*arg);
            }

            let config = builder.build().map_err(DriverError::Launch)?;
            let (browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;

            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let mut session = Self {
                browser: Some(browser),
                page: None,
                handler: Some(handler),
            };

            if let Err(e) = session.prepare_page(profile).await {
                let _ = session.shutdown().await;
                return Err(e);
            }
            Ok(session)
        }

        async fn prepare_page(&mut self, profile: &SessionProfile) -> Result<(), DriverError> {
            let browser = self.browser.as_ref().ok_or(DriverError::Closed)?;
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;

            page.execute(SetUserAgentOverrideParams::new(profile.user_agent.clone()))
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;

            let (width, height) = profile.viewport;
            page.execute(SetDeviceMetricsOverrideParams::new(
                i64::from(width),
                i64::from(height),
                1.0,
                false,
            ))
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

            if !profile.extra_headers.is_empty() {
                let headers: serde_json::Map<String, serde_json::Value> = profile
                    .extra_headers
                    .iter()
                    .map(|(name, value)| (name.clone(), serde_json::Value::String(value.clone())))
                    .collect();
                page.execute(SetExtraHttpHeadersParams::new(Headers::new(serde_json::Value::Object(
                    headers,
                ))))
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;
            }

            for script in STEALTH_SCRIPTS {
                if let Err(e) = page
                    .execute(AddScriptToEvaluateOnNewDocumentParams::new(script.to_string()))
                    .await
                {
                    log::debug!("Stealth script registration skipped: {}", e);
                }
            }

            self.page = Some(page);
            Ok(())
        }

        fn page(&self) -> Result<&Page, DriverError> {
            self.page.as_ref().ok_or(DriverError::Closed)
        }

        async fn goto(page: &Page, url: &str, timeout: Duration) -> Result<(), DriverError> {
            log::info!("Navigating to {}", url);
            tokio::time::timeout(timeout, page.goto(url))
                .await
                .map_err(|_| DriverError::Timeout(format!("navigation to {} after {:?}", url, timeout)))?
                .map_err(|e| DriverError::Navigation(format!("{}: {}", url, e)))?;
            Ok(())
        }

        async fn shutdown(&mut self) -> Result<(), DriverError> {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    log::debug!("Page close failed: {}", e);
                }
            }
            let mut result = Ok(());
            if let Some(mut browser) = self.browser.take() {
                let bound = config::browser::close_timeout();
                let closed = tokio::time::timeout(bound, browser.close()).await;
                if !matches!(closed, Ok(Ok(_))) {
                    result = Err(match closed {
                        Ok(Err(e)) => DriverError::Launch(format!("browser close failed: {}", e)),
                        _ => DriverError::Timeout(format!("browser close after {:?}", bound)),
                    });
                    // the CDP connection is gone or stuck; the process will not exit on its own
                    let _ = browser.kill().await;
                }
                if tokio::time::timeout(bound, browser.wait()).await.is_err() {
                    log::warn!("Browser process did not exit within {:?}", bound);
                }
            }
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
            result
        }
    }

    fn to_response(event: &EventResponseReceived) -> ObservedResponse {
        ObservedResponse::new(
            event.response.url.clone(),
            event.response.mime_type.clone(),
            event.response.status as u16,
        )
    }

    #[async_trait]
    impl PageSession for ChromiumSession {
        async fn set_cookies(&mut self, cookies: &[SessionCookie]) -> Result<(), DriverError> {
            let page = self.page()?;
            for cookie in cookies {
                let param = CookieParam::builder()
                    .name(cookie.name.clone())
                    .value(cookie.value.clone())
                    .domain(cookie.domain.clone())
                    .path(cookie.path.clone())
                    .secure(cookie.secure)
                    .http_only(cookie.http_only)
                    .build();

                match param {
                    Ok(param) => {
                        if let Err(e) = page.set_cookie(param).await {
                            log::warn!("Failed to set cookie {}: {}", cookie.name, e);
                        }
                    }
                    Err(e) => log::warn!("Failed to build cookie {}: {}", cookie.name, e),
                }
            }
            Ok(())
        }

        async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError> {
            let page = self.page()?;
            Self::goto(page, url, timeout).await
        }

        async fn navigate_observed(
            &mut self,
            url: &str,
            timeout: Duration,
            settle: Duration,
            observer: &mut (dyn ResponseObserver + Send),
        ) -> Result<(), DriverError> {
            let page = self.page()?;
            page.execute(EnableParams::default())
                .await
                .map_err(|e| DriverError::Interception(e.to_string()))?;
            let mut events = page
                .event_listener::<EventResponseReceived>()
                .await
                .map_err(|e| DriverError::Interception(e.to_string()))?;

            let navigation = Self::goto(page, url, timeout);
            tokio::pin!(navigation);
            loop {
                tokio::select! {
                    result = &mut navigation => {
                        result?;
                        break;
                    }
                    Some(event) = events.next() => observer.observe(&to_response(&event)),
                }
            }

            let window = tokio::time::sleep(settle);
            tokio::pin!(window);
            loop {
                tokio::select! {
                    _ = &mut window => break,
                    event = events.next() => match event {
                        Some(event) => observer.observe(&to_response(&event)),
                        None => break,
                    },
                }
            }
            Ok(())
        }

        async fn content(&mut self) -> Result<String, DriverError> {
            self.page()?
                .content()
                .await
                .map_err(|e| DriverError::Evaluation(e.to_string()))
        }

        async fn evaluate(&mut self, expression: &str) -> Result<serde_json::Value, DriverError> {
            let result = self
                .page()?
                .evaluate(expression.to_string())
                .await
                .map_err(|e| DriverError::Evaluation(e.to_string()))?;
            // `undefined` has no JSON value
            Ok(result.into_value::<serde_json::Value>().unwrap_or(serde_json::Value::Null))
        }

        async fn close(&mut self) -> Result<(), DriverError> {
            self.shutdown().await
        }
    }

    impl Drop for ChromiumSession {
        fn drop(&mut self) {
            if let Some(handler) = self.handler.take() {
                handler.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_options() {
        let driver = ChromiumDriver::new(false, Some("/usr/bin/chromium".into()));
        assert!(!driver.headless());
        assert_eq!(driver.chrome_path(), Some("/usr/bin/chromium"));
        assert_eq!(driver.name(), "chromium");
    }

    #[cfg(not(feature = "browser"))]
    #[tokio::test]
    async fn test_unavailable_without_browser_feature() {
        let driver = ChromiumDriver::new(true, None);
        let result = driver.open_session(&SessionProfile::post()).await;
        assert!(matches!(result, Err(DriverError::Unavailable(_))));
    }
}
