//! # capsule-sanitize: Capture Normalization
//!
//! Makes captured web content safe and stable to hash:
//!
//! - **Inlining**: external raster images are fetched through an injected
//!   [`ResourceFetcher`] and embedded as `data:` URIs. Per-image failures
//!   are logged and leave the image untouched.
//!
//! - **Removal**: scripts, frames, plugins, fetch hints, transport-level
//!   `<meta>` directives, inline event handlers, `javascript:` URLs, modal
//!   dialogs, consent banners and credential pickers.
//!
//! - **Metadata**: title and description of the sanitized document.
//!
//! Sanitization is idempotent: feeding the output back in yields the same
//! bytes.

pub mod error;
pub mod fetch;
mod inline;
pub mod metadata;
pub mod rules;
pub mod sanitizer;

pub use error::SanitizeError;
pub use fetch::{FetchedResource, HttpFetcher, ResourceFetcher};
pub use metadata::{extract_metadata, DocumentMetadata};
pub use sanitizer::{CaptureInput, SanitizedContent, Sanitizer, SanitizerConfig, DOCUMENT_FILENAME};
