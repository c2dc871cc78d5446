//! # Capture Service
//!
//! Render, sanitize, hash, store, timestamp, persist:
//!
//! ```text
//! url ──▶ Renderer ──▶ Sanitizer ──▶ sha256 ──┬─▶ BlobStore::put ──┐
//!                                             └─▶ ProofEngine::create ─┴─▶ Record ──▶ RecordStore::put
//! ```
//!
//! Upload and proof creation run concurrently. A failed upload leaves the
//! record without a storage reference; a failed submission leaves it
//! `PENDING`. Neither aborts the capture: the digest and what could be
//! proven about it are still worth keeping.

use std::path::Path;
use std::sync::Arc;

use capsule_core::{ContentBlob, Record, SourceDescriptor};
use capsule_crypto::sha256_digest;
use capsule_proof::ProofEngine;
use capsule_sanitize::{CaptureInput, Sanitizer};

use crate::blob::BlobStore;
use crate::error::PipelineError;
use crate::records::RecordStore;
use crate::renderer::Renderer;
use crate::telemetry;

/// Filename used when an upload arrives without a usable one.
pub const DEFAULT_UPLOAD_FILENAME: &str = "upload.bin";

/// Captures URLs and uploads into evidence records.
pub struct CaptureService {
    renderer: Arc<dyn Renderer>,
    sanitizer: Arc<Sanitizer>,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
    proofs: Arc<ProofEngine>,
}

impl std::fmt::Debug for CaptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureService")
            .field("sanitizer", &self.sanitizer)
            .field("proofs", &self.proofs)
            .finish_non_exhaustive()
    }
}

impl CaptureService {
    /// Build the service from its collaborators.
    pub fn new(
        renderer: Arc<dyn Renderer>,
        sanitizer: Arc<Sanitizer>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        proofs: Arc<ProofEngine>,
    ) -> Self {
        Self {
            renderer,
            sanitizer,
            blobs,
            records,
            proofs,
        }
    }

    /// Capture the page at `url`.
    #[tracing::instrument(skip(self))]
    pub async fn capture_url(&self, url: &str) -> Result<Record, PipelineError> {
        let page = self.renderer.render(url).await?;
        let content = self
            .sanitizer
            .sanitize(CaptureInput::Document {
                html: page.html,
                base_url: Some(page.final_url),
                title_hint: page.title_hint,
            })
            .await?;
        let source = SourceDescriptor::url(url, content.title).with_description(content.description);
        self.commit(content.blob, source).await
    }

    /// Capture an uploaded file. The bytes are stored as uploaded.
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn capture_upload(&self, bytes: Vec<u8>, filename: &str) -> Result<Record, PipelineError> {
        let filename = upload_filename(filename);
        let content = self
            .sanitizer
            .sanitize(CaptureInput::Raw {
                bytes,
                filename: filename.clone(),
            })
            .await?;
        let source = SourceDescriptor::file(filename, content.title);
        self.commit(content.blob, source).await
    }

    async fn commit(&self, blob: ContentBlob, source: SourceDescriptor) -> Result<Record, PipelineError> {
        let digest = sha256_digest(&blob.bytes);
        let (stored, proof) = tokio::join!(self.blobs.put(&blob), self.proofs.create(&digest));

        let storage = match stored {
            Ok(reference) => Some(reference),
            Err(e) => {
                tracing::warn!(digest = %digest, error = %e, "upload failed; record kept without storage");
                None
            }
        };

        let record = Record::new(digest, storage, proof.proof, proof.status, source);
        self.records.put(&record).await?;
        telemetry::capture(record.proof_status);
        tracing::info!(
            record = %record.id,
            digest = %record.digest,
            status = %record.proof_status,
            stored = record.storage.is_some(),
            "capture recorded"
        );
        Ok(record)
    }
}

/// Last path component of an upload name, so client paths never reach
/// the blob store.
fn upload_filename(raw: &str) -> String {
    let raw = raw.trim();
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    Path::new(last)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_UPLOAD_FILENAME)
        .to_string()
}
