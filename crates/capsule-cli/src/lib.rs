//! # capsule-cli: TimeCapsule Command-Line Interface
//!
//! Thin clap front end over the evidence pipeline.
//!
//! ## Subcommands
//!
//! - `capture`: Capture a URL or a local file into a new record
//! - `verify`: Verify a record (exit 0 only when fully verified, 2 otherwise)
//! - `upgrade`: Resubmit or upgrade a record's timestamp proof
//! - `proof`: Inspect or export a record's `.ots` proof
//! - `hash`: SHA-256 of a file
//! - `aggregate`: Merkle aggregate of digests
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to the pipeline crates; no business logic here.
//! - Machine-readable output goes to stdout, logs go to stderr.

pub mod capture;
pub mod context;
pub mod digest;
pub mod proof;
pub mod verify;
