//! # Error Types
//!
//! Pipeline-level failures. Degradable collaborator failures (a failed
//! upload, an unreachable calendar) never surface here: they are logged
//! and folded into the record. Only what stops a capture or a lookup
//! outright becomes a [`PipelineError`].

use capsule_core::{CapsuleError, RecordId};
use capsule_proof::ProofError;
use capsule_sanitize::SanitizeError;
use thiserror::Error;

/// Invalid pipeline configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable held an unusable value.
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Errors from the capture and verification services.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The renderer produced no content.
    #[error("rendering {url} failed: {reason}")]
    Render {
        /// Requested URL.
        url: String,
        /// Failure description.
        reason: String,
    },

    /// Sanitization failed.
    #[error("sanitization failed: {0}")]
    Sanitize(#[from] SanitizeError),

    /// Blob store failure.
    #[error("blob store: {0}")]
    Blob(String),

    /// Record store failure.
    #[error("record store: {0}")]
    Records(String),

    /// No record with this id.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// Bad configuration.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    /// A network client could not be built.
    #[error("proof engine: {0}")]
    Proof(#[from] ProofError),

    /// Core domain rule violated (e.g. status regression).
    #[error(transparent)]
    Core(#[from] CapsuleError),
}
