//! # Timestamp Proofs and Their Lifecycle
//!
//! [`TimestampProof`] is an opaque byte blob produced by the proof engine.
//! [`ProofStatus`] tracks how far that blob has progressed toward a
//! confirmed ledger anchor.
//!
//! ## Lifecycle
//!
//! ```text
//! PENDING --create success--> INCOMPLETE --upgrade (anchor found)--> COMPLETE
//! PENDING --create failure--> PENDING
//! INCOMPLETE --upgrade, no anchor--> INCOMPLETE
//! ```
//!
//! The ordering `Pending < Incomplete < Complete` is derived, so callers can
//! check monotonicity with plain comparisons.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Progress of a timestamp proof toward a confirmed anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProofStatus {
    /// Submission failed; the proof is empty or unconfirmed even as pending.
    Pending,
    /// Accepted by a calendar, no confirmed ledger anchor yet.
    Incomplete,
    /// Contains a confirmed anchor. Terminal.
    Complete,
}

impl ProofStatus {
    /// Returns the canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Incomplete => "INCOMPLETE",
            Self::Complete => "COMPLETE",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, versioned proof bytes from the external ledger protocol.
///
/// The bytes are preserved exactly; only the proof engine may replace them
/// with a strictly more complete version. Serialized as base64 in JSON.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TimestampProof(Vec<u8>);

impl TimestampProof {
    /// Wrap proof bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The degenerate zero-length proof carried by `PENDING` records.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether this is the zero-length proof.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length of the proof in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The raw proof bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the proof, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for TimestampProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimestampProof({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for TimestampProof {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for TimestampProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for TimestampProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD
            .decode(s.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_is_lifecycle_order() {
        assert!(ProofStatus::Pending < ProofStatus::Incomplete);
        assert!(ProofStatus::Incomplete < ProofStatus::Complete);
        assert!(ProofStatus::Complete.is_terminal());
        assert!(!ProofStatus::Incomplete.is_terminal());
    }

    #[test]
    fn status_serde_uses_upper_case_names() {
        for status in [
            ProofStatus::Pending,
            ProofStatus::Incomplete,
            ProofStatus::Complete,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: ProofStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn proof_serializes_as_base64() {
        let proof = TimestampProof::new(vec![0x00, 0x4f, 0x54, 0x53]);
        let json = serde_json::to_string(&proof).unwrap();
        assert_eq!(json, "\"AE9UUw==\"");
        let back: TimestampProof = serde_json::from_str(&json).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn empty_proof() {
        let proof = TimestampProof::empty();
        assert!(proof.is_empty());
        assert_eq!(serde_json::to_string(&proof).unwrap(), "\"\"");
    }

    #[test]
    fn debug_does_not_dump_bytes() {
        let proof = TimestampProof::new(vec![7; 500]);
        assert_eq!(format!("{proof:?}"), "TimestampProof(500 bytes)");
    }
}
