use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration for the extraction service.
/// Every value is read once from the environment on first access.

/// HTTP port for the local API server
/// Read from PORT environment variable
/// Default: 3000 (the extension talks to http://localhost:3000)
pub static PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
});

/// Navigation/operation timeout in milliseconds
/// Read from TIMEOUT environment variable
/// Default: 60000
pub static TIMEOUT_MS: Lazy<u64> = Lazy::new(|| {
    env::var("TIMEOUT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(60_000)
});

/// Run the browser headless
/// Read from HEADLESS environment variable; anything but "false" means headless
pub static HEADLESS: Lazy<bool> = Lazy::new(|| env::var("HEADLESS").map(|v| v != "false").unwrap_or(true));

/// Path to the session cookies file (JSON array or Netscape format)
/// Read from COOKIES_PATH environment variable
/// Default: cookies.json
pub static COOKIES_PATH: Lazy<String> =
    Lazy::new(|| env::var("COOKIES_PATH").unwrap_or_else(|_| "cookies.json".to_string()));

/// Explicit Chrome/Chromium executable
/// Read from CHROME_PATH environment variable; autodetected when unset
pub static CHROME_PATH: Lazy<Option<String>> = Lazy::new(|| env::var("CHROME_PATH").ok().filter(|v| !v.is_empty()));

/// File the extension download state is persisted to at checkpoints
/// Read from STATE_PATH environment variable; state stays in memory when unset
pub static STATE_PATH: Lazy<Option<String>> = Lazy::new(|| env::var("STATE_PATH").ok().filter(|v| !v.is_empty()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: none (console only)
pub static LOG_FILE_PATH: Lazy<Option<String>> =
    Lazy::new(|| env::var("LOG_FILE_PATH").ok().filter(|v| !v.is_empty()));

/// Log level (error, warn, info, debug, trace)
/// Read from LOG_LEVEL environment variable
/// Default: info
pub static LOG_LEVEL: Lazy<String> = Lazy::new(|| env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()));

/// Extraction timing
pub mod extraction {
    use super::Duration;

    /// Wait after a post/reel page reports DOMContentLoaded (milliseconds)
    pub const POST_SETTLE_MS: u64 = 1000;

    /// Network observation window after a story page has loaded (milliseconds)
    pub const STORY_SETTLE_MS: u64 = 3000;

    /// Post settle duration
    pub fn post_settle() -> Duration {
        Duration::from_millis(POST_SETTLE_MS)
    }

    /// Story settle duration
    pub fn story_settle() -> Duration {
        Duration::from_millis(STORY_SETTLE_MS)
    }
}

/// Carousel navigation
pub mod carousel {
    use super::Duration;

    /// Maximum number of "next" clicks per post
    pub const MAX_ADVANCES: usize = 20;

    /// Wait after each "next" click before reading the view (milliseconds)
    pub const STEP_SETTLE_MS: u64 = 400;

    /// Carousel step settle duration
    pub fn step_settle() -> Duration {
        Duration::from_millis(STEP_SETTLE_MS)
    }
}

/// Story network capture
pub mod capture {
    /// Maximum number of candidates one story page load may accumulate
    pub const MAX_CAPTURED: usize = 64;

    /// Image URLs shorter than this are treated as noise
    pub const IMAGE_URL_MIN_LEN: usize = 150;

    /// Video URLs must be longer than this
    pub const VIDEO_URL_MIN_LEN: usize = 100;
}

/// Browser launch settings
pub mod browser {
    /// Desktop Chrome user agent sent by every session
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

    /// Accept-Language header
    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    /// Accept header
    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

    /// Viewport for posts and reels
    pub const POST_VIEWPORT: (u32, u32) = (1280, 720);

    /// Viewport for stories
    pub const STORY_VIEWPORT: (u32, u32) = (1920, 1080);

    /// Upper bound on tearing down a session, browser exit included (milliseconds)
    pub const CLOSE_TIMEOUT_MS: u64 = 5000;

    /// Session teardown bound
    pub fn close_timeout() -> super::Duration {
        super::Duration::from_millis(CLOSE_TIMEOUT_MS)
    }
}

/// Operation timeout duration (one navigation)
pub fn operation_timeout() -> Duration {
    Duration::from_millis(*TIMEOUT_MS)
}

/// Budget for a whole request: navigation plus settle waits and carousel clicks
pub fn request_timeout() -> Duration {
    operation_timeout() * 2
}
