//! Error types for sanitization.

use thiserror::Error;

/// Errors raised by the sanitizer and its resource fetcher.
///
/// Only [`SanitizeError::Rewrite`] and [`SanitizeError::InvalidBaseUrl`]
/// ever escape [`crate::Sanitizer::sanitize`]. Fetch failures are logged
/// per resource and leave the image untouched.
#[derive(Error, Debug)]
pub enum SanitizeError {
    /// The HTML rewriter rejected the document.
    #[error("HTML rewrite failed: {0}")]
    Rewrite(String),

    /// The document base URL cannot be parsed.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A resource could not be fetched.
    #[error("fetch of {url} failed: {reason}")]
    Fetch {
        /// Resource URL.
        url: String,
        /// Failure reason.
        reason: String,
    },

    /// A resource exceeded the size cap.
    #[error("resource {url} exceeds {limit} bytes")]
    TooLarge {
        /// Resource URL.
        url: String,
        /// Configured cap.
        limit: usize,
    },
}

impl From<lol_html::errors::RewritingError> for SanitizeError {
    fn from(e: lol_html::errors::RewritingError) -> Self {
        Self::Rewrite(e.to_string())
    }
}
