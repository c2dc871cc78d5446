//! Offline helpers over proof bytes. None of them touch the network.

use capsule_core::{ContentDigest, TimestampProof};

use crate::ots::DetachedTimestampFile;

/// Text shown when a proof cannot be parsed.
pub const UNREADABLE_PROOF_INFO: &str = "Unable to read proof info";

/// Human-readable dump of a proof.
pub fn proof_info(proof: &TimestampProof) -> String {
    match DetachedTimestampFile::deserialize(proof.as_bytes()) {
        Ok(file) => file.info(),
        Err(_) => UNREADABLE_PROOF_INFO.to_string(),
    }
}

/// Whether the proof already contains a Bitcoin attestation.
pub fn is_proof_complete(proof: &TimestampProof) -> bool {
    DetachedTimestampFile::deserialize(proof.as_bytes())
        .map(|file| file.timestamp().is_complete())
        .unwrap_or(false)
}

/// The SHA-256 digest a proof commits to, if it parses and was stamped
/// with SHA-256.
pub fn committed_digest(proof: &TimestampProof) -> Option<ContentDigest> {
    DetachedTimestampFile::deserialize(proof.as_bytes())
        .ok()
        .and_then(|file| file.content_digest())
}
