//! # capsule-proof: Timestamp Proof Engine
//!
//! Anchors content digests into Bitcoin through OpenTimestamps calendars:
//!
//! - **Format** (`ots`): detached `.ots` proofs. Op/attestation tree,
//!   strict bounded parser, canonical serializer, merge.
//!
//! - **Calendars** (`calendar`): [`CalendarClient`] trait, the HTTP
//!   implementation, and the whitelist that gates which calendars an
//!   untrusted proof may send us to.
//!
//! - **Chain** (`chain`): [`BlockSource`] trait and an Esplora-backed
//!   implementation for checking Bitcoin attestations.
//!
//! - **Engine** (`engine`): [`ProofEngine`] with `create`, `upgrade` and
//!   `verify`. Failures degrade to a status or outcome, never an error.
//!
//! - **Inspection** (`inspect`): offline proof info, completeness and
//!   committed-digest helpers.
//!
//! - **Mock** (`mock`): [`MockLedger`], an in-memory calendar plus block
//!   source producing real proofs.
//!
//! ## Crate Policy
//!
//! - Depends on `capsule-core` and `capsule-crypto` internally.
//! - Collaborators are injected as `Arc<dyn Trait>`; no global clients.
//! - Every network call carries a timeout.

pub mod calendar;
pub mod chain;
pub mod engine;
pub mod error;
pub mod inspect;
pub mod mock;
pub mod ots;

pub use calendar::{CalendarClient, CalendarWhitelist, HttpCalendarClient};
pub use chain::{BlockHeader, BlockSource, EsploraBlockSource};
pub use engine::{
    Anchor, ProofConfig, ProofEngine, ProofUpdate, Verdict, VerificationOutcome, DEFAULT_CALENDARS,
};
pub use error::ProofError;
pub use inspect::{committed_digest, is_proof_complete, proof_info};
pub use mock::MockLedger;
