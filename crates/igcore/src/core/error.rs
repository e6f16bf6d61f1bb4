use thiserror::Error;

use crate::driver::DriverError;
use crate::types::ErrorCode;

/// Centralized error types for the application
///
/// Everything that is not part of the extraction taxonomy (file
/// IO, JSON, outbound HTTP) ends up here. Extraction failures use [`ExtractError`]
/// so they can be mapped onto a wire [`ErrorCode`].
///
/// # Example
///
/// ```no_run
/// use igcore::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy of a single extraction request.
///
/// Every variant is converted at the request boundary into an unsuccessful
/// `ExtractionResult`; none of them escape to the caller as a panic.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Malformed or unsupported URL, detected before any session is opened
    #[error("{0}")]
    InvalidUrl(String),

    /// The page loaded but reports that the resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// The page loaded but no candidate survived filtering and ranking
    #[error("{0}")]
    NoMedia(String),

    /// Navigation, evaluation or interception failed
    #[error("{0}")]
    Transport(#[from] DriverError),
}

impl ExtractError {
    /// Wire code reported to the extension
    pub fn code(&self) -> ErrorCode {
        match self {
            ExtractError::InvalidUrl(_) => ErrorCode::InvalidUrl,
            ExtractError::NotFound(_) => ErrorCode::NotFound,
            ExtractError::NoMedia(_) => ErrorCode::NoMedia,
            ExtractError::Transport(_) => ErrorCode::Error,
        }
    }

    /// Returns subcategory for log lines
    pub fn subcategory(&self) -> &'static str {
        match self {
            ExtractError::InvalidUrl(_) => "invalid_url",
            ExtractError::NotFound(_) => "not_found",
            ExtractError::NoMedia(_) => "no_media",
            ExtractError::Transport(e) => e.subcategory(),
        }
    }
}
