//! Error types for the proof engine.
//!
//! Most of these never reach callers of [`crate::ProofEngine`]: `create`,
//! `upgrade` and `verify` degrade them into a [`capsule_core::ProofStatus`]
//! or a [`crate::VerificationOutcome`]. They surface directly from the codec
//! and from the collaborator implementations.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while handling timestamp proofs.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The proof bytes are malformed: truncated, bad magic, unknown tag,
    /// limit exceeded, trailing data.
    #[error("malformed proof: {0}")]
    Codec(String),

    /// An op could not be evaluated on its input message.
    #[error("op evaluation failed: {0}")]
    Op(String),

    /// The proof carries no bytes at all.
    #[error("proof is empty")]
    Empty,

    /// A calendar server failed or returned an unusable answer.
    #[error("calendar {url} failed: {reason}")]
    Calendar {
        /// Calendar base URL.
        url: String,
        /// Failure reason.
        reason: String,
    },

    /// A pending attestation points at a calendar outside the whitelist.
    #[error("calendar not whitelisted: {0}")]
    NotWhitelisted(String),

    /// Fewer calendars accepted the commitment than required.
    #[error("only {accepted} of {required} required calendars accepted the commitment")]
    InsufficientCalendars {
        /// Calendars that answered.
        accepted: usize,
        /// Minimum configured.
        required: usize,
    },

    /// The block-header source failed.
    #[error("block source error: {0}")]
    BlockSource(String),

    /// A network call exceeded its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Two timestamps for different messages were merged.
    #[error("cannot merge timestamps: {0}")]
    Merge(String),

    /// Invalid engine or client configuration.
    #[error("invalid proof configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = ProofError::Calendar {
            url: "https://a.pool.opentimestamps.org".into(),
            reason: "HTTP 503".into(),
        };
        assert_eq!(
            err.to_string(),
            "calendar https://a.pool.opentimestamps.org failed: HTTP 503"
        );
        let err = ProofError::InsufficientCalendars {
            accepted: 1,
            required: 2,
        };
        assert!(err.to_string().contains("1 of 2"));
        assert_eq!(
            ProofError::Timeout(Duration::from_secs(3)).to_string(),
            "timed out after 3s"
        );
    }
}
