//! # SHA-256 Digest Computation
//!
//! Computes [`ContentDigest`] values from raw content bytes. The content
//! handed in here is already sanitized; this layer does no normalization of
//! its own, so the same bytes always yield the same digest across processes
//! and time.

use capsule_core::ContentDigest;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compute the SHA-256 content digest of `data`.
pub fn sha256_digest(data: &[u8]) -> ContentDigest {
    let hash = Sha256::digest(data);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest::from_bytes(bytes)
}

/// Compute the SHA-256 digest of `data` as a lowercase hex string.
pub fn sha256_hex(data: &[u8]) -> String {
    sha256_digest(data).to_hex()
}

/// Check that `data` hashes to `expected`.
///
/// Comparison is constant-time so that probing stored content against a
/// known digest leaks nothing about partial matches.
pub fn verify_content(data: &[u8], expected: &ContentDigest) -> bool {
    let actual = sha256_digest(data);
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}
