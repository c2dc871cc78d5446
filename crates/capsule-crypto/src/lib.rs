//! # capsule-crypto: Digest Engine
//!
//! Provides the hashing layer of the evidence pipeline:
//!
//! - **SHA-256 content digests** over arbitrary in-memory bytes, producing
//!   [`ContentDigest`](capsule_core::ContentDigest) values.
//! - **Constant-time verification** of content against an expected digest.
//! - **Merkle aggregation** of many digests into one commitment, the
//!   building block for batch proofs.
//!
//! ## Crate Policy
//!
//! - Depends only on `capsule-core` internally.
//! - Digest computation is infallible; only aggregation of an empty input
//!   can fail.
//! - No mocking of cryptographic operations in tests; all tests use real
//!   SHA-256.

pub mod error;
pub mod merkle;
pub mod sha256;

pub use error::CryptoError;
pub use merkle::{aggregate, node_hash};
pub use sha256::{sha256_digest, sha256_hex, verify_content};
