//! Testing utilities: a scripted render driver that needs no browser.
//!
//! ## Usage
//!
//! ```rust
//! use igcore::testing::{MockDriver, ScriptedPage};
//!
//! let driver = MockDriver::new().with_page(
//!     "https://www.instagram.com/p/ABC/",
//!     ScriptedPage::html(r#"{"display_url":"https://scontent.cdninstagram.com/a.jpg"}"#),
//! );
//! assert_eq!(driver.stats().opened(), 0);
//! ```

pub mod mock_driver;

pub use mock_driver::{MockDriver, MockDriverStats, ScriptedPage};
