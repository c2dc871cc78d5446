//! # Digest Engine Properties
//!
//! Property tests over arbitrary byte sequences and digest lists. The
//! merkle tests recompute the reduction with an independent recursive
//! definition and compare.

use capsule_core::ContentDigest;
use capsule_crypto::{aggregate, sha256_digest, verify_content, CryptoError};
use proptest::prelude::*;

/// Recursive reference reduction, written level-by-level.
fn reference_root(level: Vec<ContentDigest>) -> ContentDigest {
    if level.len() == 1 {
        return level[0];
    }
    let mut next = Vec::new();
    let mut i = 0;
    while i < level.len() {
        if i + 1 < level.len() {
            let mut buf = level[i].as_bytes().to_vec();
            buf.extend_from_slice(level[i + 1].as_bytes());
            next.push(sha256_digest(&buf));
        } else {
            next.push(level[i]);
        }
        i += 2;
    }
    reference_root(next)
}

fn digest_strategy() -> impl Strategy<Value = ContentDigest> {
    any::<[u8; 32]>().prop_map(ContentDigest::from_bytes)
}

proptest! {
    /// Same bytes, same digest.
    #[test]
    fn digest_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        prop_assert_eq!(sha256_digest(&data), sha256_digest(&data));
    }

    /// Distinct bytes never collide in practice.
    #[test]
    fn distinct_inputs_do_not_collide(
        a in proptest::collection::vec(any::<u8>(), 0..512),
        b in proptest::collection::vec(any::<u8>(), 0..512),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(sha256_digest(&a), sha256_digest(&b));
    }

    /// Hex rendering parses back to the same digest.
    #[test]
    fn hex_rendering_parses_back(data in proptest::collection::vec(any::<u8>(), 0..256)) {
        let d = sha256_digest(&data);
        let parsed: ContentDigest = d.to_hex().parse().unwrap();
        prop_assert_eq!(parsed, d);
        prop_assert!(verify_content(&data, &parsed));
    }

    /// The iterative reduction agrees with the recursive reference.
    #[test]
    fn aggregate_matches_reference(digests in proptest::collection::vec(digest_strategy(), 1..40)) {
        prop_assert_eq!(aggregate(&digests).unwrap(), reference_root(digests.clone()));
    }
}

#[test]
fn aggregate_empty_is_error() {
    assert_eq!(aggregate(&[]), Err(CryptoError::EmptyInput));
}

#[test]
fn aggregate_known_hex_vector() {
    // SHA256("") || SHA256("abc") re-hashed.
    let a = sha256_digest(b"");
    let b = sha256_digest(b"abc");
    let mut concat = a.as_bytes().to_vec();
    concat.extend_from_slice(b.as_bytes());
    assert_eq!(aggregate(&[a, b]).unwrap().to_hex(), hex::encode(sha256_digest(&concat).as_bytes()));
}
