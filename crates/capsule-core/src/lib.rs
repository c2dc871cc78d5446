//! # capsule-core: Foundational Types for TimeCapsule
//!
//! This crate defines the value types that flow through the evidence
//! pipeline. Every other crate in the workspace depends on `capsule-core`;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Fixed-width digests.** [`ContentDigest`] is exactly 32 bytes and is
//!    rendered as lowercase hex at every boundary (Display, serde, CLI).
//!
//! 2. **Opaque proofs.** [`TimestampProof`] carries the ledger protocol's
//!    bytes untouched. Only the proof engine interprets them.
//!
//! 3. **Monotonic lifecycle.** [`ProofStatus`] is totally ordered
//!    (`Pending < Incomplete < Complete`) and [`Record::apply_proof_update`]
//!    refuses any transition that would move a record backward.
//!
//! 4. **UTC-only timestamps.** [`Timestamp`] enforces UTC with seconds
//!    precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `capsule-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod proof;
pub mod record;
pub mod temporal;

pub use digest::ContentDigest;
pub use error::CapsuleError;
pub use proof::{ProofStatus, TimestampProof};
pub use record::{ContentBlob, Record, RecordId, SourceDescriptor, SourceKind, StorageReference};
pub use temporal::Timestamp;
