//! # Merkle Aggregation
//!
//! Reduces a sequence of digests to a single commitment:
//!
//! - Adjacent pairs are concatenated and re-hashed: `SHA256(left || right)`.
//! - An unpaired trailing digest is promoted unchanged to the next level.
//! - Levels repeat until exactly one digest remains.
//!
//! There is no domain separation and no duplication of the odd element.
//! Downstream batch verification recomputes this exact reduction, so the
//! shape must not change.

use capsule_core::ContentDigest;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Hash two digests into their parent: `SHA256(left || right)`.
pub fn node_hash(left: &ContentDigest, right: &ContentDigest) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    ContentDigest::from_bytes(out)
}

/// Aggregate digests into a single merkle root.
///
/// Returns the input unchanged for a single digest and
/// [`CryptoError::EmptyInput`] for none.
pub fn aggregate(digests: &[ContentDigest]) -> Result<ContentDigest, CryptoError> {
    let mut level: Vec<ContentDigest> = match digests {
        [] => return Err(CryptoError::EmptyInput),
        [only] => return Ok(*only),
        many => many.to_vec(),
    };

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut pairs = level.chunks_exact(2);
        for pair in &mut pairs {
            next.push(node_hash(&pair[0], &pair[1]));
        }
        next.extend_from_slice(pairs.remainder());
        level = next;
    }

    level.pop().ok_or(CryptoError::EmptyInput)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sha256::sha256_digest;

    fn leaves(n: usize) -> Vec<ContentDigest> {
        (0..n).map(|i| sha256_digest(format!("leaf-{i}").as_bytes())).collect()
    }

    fn h(l: &ContentDigest, r: &ContentDigest) -> ContentDigest {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(l.as_bytes());
        buf.extend_from_slice(r.as_bytes());
        sha256_digest(&buf)
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(aggregate(&[]), Err(CryptoError::EmptyInput));
    }

    #[test]
    fn single_digest_is_identity() {
        let d = leaves(1);
        assert_eq!(aggregate(&d).unwrap(), d[0]);
    }

    #[test]
    fn two_digests() {
        let d = leaves(2);
        assert_eq!(aggregate(&d).unwrap(), h(&d[0], &d[1]));
    }

    #[test]
    fn three_digests_promote_trailing() {
        let d = leaves(3);
        let expected = h(&h(&d[0], &d[1]), &d[2]);
        assert_eq!(aggregate(&d).unwrap(), expected);
    }

    #[test]
    fn four_digests() {
        let d = leaves(4);
        let expected = h(&h(&d[0], &d[1]), &h(&d[2], &d[3]));
        assert_eq!(aggregate(&d).unwrap(), expected);
    }

    #[test]
    fn five_digests() {
        let d = leaves(5);
        // Level 1: [h01, h23, d4]; level 2: [h(h01,h23), d4]; root.
        let expected = h(&h(&h(&d[0], &d[1]), &h(&d[2], &d[3])), &d[4]);
        assert_eq!(aggregate(&d).unwrap(), expected);
    }

    #[test]
    fn order_matters() {
        let d = leaves(2);
        let swapped = vec![d[1], d[0]];
        assert_ne!(aggregate(&d).unwrap(), aggregate(&swapped).unwrap());
    }

    #[test]
    fn node_hash_matches_concatenation() {
        let d = leaves(2);
        assert_eq!(node_hash(&d[0], &d[1]), h(&d[0], &d[1]));
    }
}
