//! Wiring of collaborators into the capture and verification services.

use std::sync::Arc;

use capsule_proof::{
    BlockSource, CalendarClient, EsploraBlockSource, HttpCalendarClient, ProofConfig, ProofEngine,
};
use capsule_sanitize::{HttpFetcher, ResourceFetcher, Sanitizer, SanitizerConfig};

use crate::blob::{BlobStore, FsBlobStore};
use crate::capture::CaptureService;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::gateway::GatewayBlobStore;
use crate::records::{FsRecordStore, RecordStore};
use crate::renderer::{HttpRenderer, Renderer};
use crate::verify::RecordVerifier;

/// External collaborators of the pipeline.
pub struct Collaborators {
    /// Page renderer.
    pub renderer: Arc<dyn Renderer>,
    /// Image fetcher used by the sanitizer.
    pub fetcher: Arc<dyn ResourceFetcher>,
    /// Blob store.
    pub blobs: Arc<dyn BlobStore>,
    /// Record store.
    pub records: Arc<dyn RecordStore>,
    /// Calendar client.
    pub calendar: Arc<dyn CalendarClient>,
    /// Block-header source.
    pub blocks: Arc<dyn BlockSource>,
}

/// The assembled pipeline.
pub struct Pipeline {
    /// Capture service.
    pub capture: CaptureService,
    /// Verification orchestrator.
    pub verifier: RecordVerifier,
    /// Shared record store.
    pub records: Arc<dyn RecordStore>,
    /// Shared proof engine.
    pub proofs: Arc<ProofEngine>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("capture", &self.capture)
            .field("verifier", &self.verifier)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Assemble from explicit collaborators.
    pub fn assemble(
        collaborators: Collaborators,
        proof_config: ProofConfig,
        sanitizer_config: SanitizerConfig,
    ) -> Self {
        let Collaborators {
            renderer,
            fetcher,
            blobs,
            records,
            calendar,
            blocks,
        } = collaborators;
        let proofs = Arc::new(ProofEngine::new(calendar, blocks, proof_config));
        let sanitizer = Arc::new(Sanitizer::new(fetcher, sanitizer_config));
        Self {
            capture: CaptureService::new(
                renderer,
                sanitizer,
                blobs.clone(),
                records.clone(),
                proofs.clone(),
            ),
            verifier: RecordVerifier::new(proofs.clone(), blobs, records.clone()),
            records,
            proofs,
        }
    }

    /// Production wiring: HTTP renderer, fetcher, calendars and Esplora,
    /// filesystem stores under the data directory. Blobs are read back
    /// through the gateway when one is configured.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let mut blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(config.blob_dir()));
        if let Some(gateway) = &config.blob_gateway {
            blobs = Arc::new(GatewayBlobStore::new(blobs, gateway, config.http_timeout)?);
        }
        let collaborators = Collaborators {
            renderer: Arc::new(HttpRenderer::new(config.http_timeout)?),
            fetcher: Arc::new(HttpFetcher::new(config.fetch_timeout)?),
            blobs,
            records: Arc::new(FsRecordStore::new(config.record_dir())),
            calendar: Arc::new(HttpCalendarClient::new(config.http_timeout)?),
            blocks: Arc::new(EsploraBlockSource::new(
                config.esplora_url.clone(),
                config.http_timeout,
            )?),
        };
        tracing::debug!(
            data_dir = %config.data_dir.display(),
            calendars = config.calendars.len(),
            gateway = config.blob_gateway.as_deref().unwrap_or("none"),
            "pipeline assembled"
        );
        Ok(Self::assemble(
            collaborators,
            config.proof_config()?,
            config.sanitizer_config(),
        ))
    }
}
