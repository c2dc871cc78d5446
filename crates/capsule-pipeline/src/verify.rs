//! # Verification Orchestrator
//!
//! Cross-checks a record against three independent sources of truth:
//!
//! - **Proof**: does the timestamp proof commit to the record digest, and
//!   is its anchor (if any) consistent with the ledger?
//! - **Digest**: is the digest committed inside the proof the record's own?
//! - **Storage**: do the stored bytes still hash to the record digest?
//!
//! `INCOMPLETE` records are upgraded first, and an upgrade to `COMPLETE` is
//! persisted before the proof is checked. Storage failures degrade to
//! `storage_intact = false` instead of aborting.

use std::sync::Arc;

use capsule_core::{ContentDigest, ProofStatus, Record, RecordId, StorageReference};
use capsule_crypto::verify_content;
use capsule_proof::{committed_digest, ProofEngine, ProofUpdate, VerificationOutcome};
use serde::Serialize;

use crate::blob::BlobStore;
use crate::error::PipelineError;
use crate::records::RecordStore;
use crate::telemetry;

/// Combined verification result for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordVerification {
    /// Verified record.
    pub record_id: RecordId,
    /// Record digest.
    pub digest: ContentDigest,
    /// Whether the proof commits to the record digest.
    pub digest_valid: bool,
    /// Proof engine verdict.
    pub proof: VerificationOutcome,
    /// Whether the stored bytes still hash to the record digest.
    pub storage_intact: bool,
    /// Proof status after any upgrade performed during verification.
    pub proof_status: ProofStatus,
}

impl RecordVerification {
    /// Proof verified and storage intact.
    pub fn fully_verified(&self) -> bool {
        self.proof.verified && self.storage_intact
    }
}

/// Verifies and refreshes records.
pub struct RecordVerifier {
    proofs: Arc<ProofEngine>,
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn RecordStore>,
}

impl std::fmt::Debug for RecordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordVerifier")
            .field("proofs", &self.proofs)
            .finish_non_exhaustive()
    }
}

impl RecordVerifier {
    /// Build a verifier from its collaborators.
    pub fn new(
        proofs: Arc<ProofEngine>,
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            proofs,
            blobs,
            records,
        }
    }

    /// Load and verify the record `id`.
    pub async fn verify_by_id(&self, id: &RecordId) -> Result<RecordVerification, PipelineError> {
        let record = self.load(id).await?;
        Ok(self.verify_record(record).await)
    }

    /// Verify `record`.
    #[tracing::instrument(skip_all, fields(record = %record.id, digest = %record.digest))]
    pub async fn verify_record(&self, record: Record) -> RecordVerification {
        let digest = record.digest;
        let storage = record.storage.clone();
        let (record, storage_intact) = tokio::join!(
            self.upgraded(record),
            self.storage_intact(digest, storage.as_ref())
        );
        let proof = self.proofs.verify(&record.proof, &record.digest).await;
        let digest_valid = committed_digest(&record.proof) == Some(record.digest);

        let verification = RecordVerification {
            record_id: record.id,
            digest: record.digest,
            digest_valid,
            proof,
            storage_intact,
            proof_status: record.proof_status,
        };
        telemetry::verification(verification.fully_verified());
        tracing::info!(
            verified = verification.proof.verified,
            digest_valid,
            storage_intact,
            status = %verification.proof_status,
            "record verified"
        );
        verification
    }

    /// Try to advance the proof of record `id`: resubmit when `PENDING`,
    /// upgrade when `INCOMPLETE`. Improvements are persisted.
    pub async fn refresh_by_id(&self, id: &RecordId) -> Result<Record, PipelineError> {
        let record = self.load(id).await?;
        self.refresh_proof(record).await
    }

    /// Try to advance the proof of `record`. `COMPLETE` records are
    /// returned untouched.
    #[tracing::instrument(skip_all, fields(record = %record.id, status = %record.proof_status))]
    pub async fn refresh_proof(&self, record: Record) -> Result<Record, PipelineError> {
        let update = match record.proof_status {
            ProofStatus::Complete => return Ok(record),
            ProofStatus::Pending => self.proofs.create(&record.digest).await,
            ProofStatus::Incomplete => {
                let update = self.proofs.upgrade(&record.proof).await;
                telemetry::proof_upgrade(update.status);
                update
            }
        };
        if update.status <= record.proof_status {
            tracing::debug!("no progress");
            return Ok(record);
        }
        self.records
            .update_proof(&record.id, update.proof, update.status)
            .await
    }

    async fn load(&self, id: &RecordId) -> Result<Record, PipelineError> {
        self.records
            .get(id)
            .await?
            .ok_or(PipelineError::NotFound(*id))
    }

    /// Upgrade an `INCOMPLETE` record, persisting a `COMPLETE` result. A
    /// persistence failure is logged; the upgraded proof is still used.
    async fn upgraded(&self, mut record: Record) -> Record {
        if record.proof_status != ProofStatus::Incomplete {
            return record;
        }
        let ProofUpdate { proof, status } = self.proofs.upgrade(&record.proof).await;
        telemetry::proof_upgrade(status);
        if status != ProofStatus::Complete {
            return record;
        }
        if let Err(e) = self
            .records
            .update_proof(&record.id, proof.clone(), status)
            .await
        {
            tracing::warn!(error = %e, "failed to persist upgraded proof");
        }
        match record.apply_proof_update(proof, status) {
            Ok(_) => tracing::info!("proof upgraded to complete during verification"),
            Err(e) => tracing::warn!(error = %e, "upgraded proof rejected"),
        }
        record
    }

    async fn storage_intact(&self, digest: ContentDigest, storage: Option<&StorageReference>) -> bool {
        let Some(reference) = storage else {
            tracing::warn!("record has no storage reference");
            return false;
        };
        match self.blobs.get(reference).await {
            Ok(bytes) => {
                let intact = verify_content(&bytes, &digest);
                if !intact {
                    tracing::warn!(reference = %reference.url, "stored content does not match record digest");
                }
                intact
            }
            Err(e) => {
                tracing::warn!(reference = %reference.url, error = %e, "stored content unavailable");
                false
            }
        }
    }
}
