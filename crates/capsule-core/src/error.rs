//! # Error Types
//!
//! Errors raised by the core value types. Component crates define their own
//! `thiserror` enums and wrap this one where they surface core failures.

use thiserror::Error;

use crate::proof::ProofStatus;

/// Top-level error type for core domain values.
#[derive(Error, Debug)]
pub enum CapsuleError {
    /// A digest could not be parsed or had the wrong length.
    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    /// A proof status transition would move a record backward.
    #[error("invalid proof status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status of the record.
        from: ProofStatus,
        /// Rejected target status.
        to: ProofStatus,
    },

    /// A record identifier could not be parsed.
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    /// Timestamp parsing failed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
