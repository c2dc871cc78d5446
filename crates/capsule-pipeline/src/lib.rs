//! # capsule-pipeline: Capture and Verification
//!
//! Ties the sanitizer, digest engine and proof engine to the storage
//! collaborators:
//!
//! - [`CaptureService`] turns a URL or an upload into a persisted
//!   [`Record`](capsule_core::Record).
//! - [`RecordVerifier`] upgrades, verifies and cross-checks records.
//! - [`BlobStore`], [`RecordStore`] and [`Renderer`] are the seams to the
//!   outside world, with filesystem, in-memory and HTTP implementations
//!   ([`GatewayBlobStore`] reads blobs back through an HTTP gateway).
//! - [`PipelineConfig`] reads `CAPSULE_*` environment variables and
//!   [`Pipeline::from_config`] wires the production collaborators.
//!
//! Counters are emitted through the `metrics` facade (see [`telemetry`]);
//! installing a recorder is left to the host process.

pub mod blob;
pub mod capture;
pub mod config;
pub mod error;
pub mod gateway;
pub mod records;
pub mod renderer;
pub mod service;
pub mod telemetry;
pub mod verify;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use capture::CaptureService;
pub use config::PipelineConfig;
pub use error::{ConfigError, PipelineError};
pub use gateway::GatewayBlobStore;
pub use records::{FsRecordStore, MemoryRecordStore, RecordStore};
pub use renderer::{HttpRenderer, RenderedPage, Renderer};
pub use service::{Collaborators, Pipeline};
pub use verify::{RecordVerification, RecordVerifier};
