//! igcore - Instagram media extraction pipeline
//!
//! Turns a post, reel or story URL into the list of downloadable media URLs.
//! The browser is hidden behind the `RenderDriver` trait; this crate has no
//! HTTP server.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors and logging
//! - `driver`: Render-driver traits, session cookies, the Chromium backend
//! - `extract`: Classifier, candidate strategies, filter, ranker, carousel walker
//! - `pipeline`: Per-request orchestration (`Extractor`)
//! - `testing`: Scripted render driver for tests
//! - `types`: Data model shared with the HTTP layer

pub mod core;
pub mod driver;
pub mod extract;
pub mod pipeline;
pub mod testing;
pub mod types;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult, ExtractError};
pub use driver::{ChromiumDriver, DriverError, PageSession, RenderDriver, SessionCookie, SessionProfile};
pub use extract::classify;
pub use pipeline::{Extractor, ScrapeOptions};
pub use types::{ErrorCode, ExtractionRequest, ExtractionResult, MediaCandidate, MediaKind, MediaType};
