//! # Record Storage
//!
//! Durable evidence records. Proof updates go through
//! [`RecordStore::update_proof`], which re-reads the stored record and
//! applies [`Record::apply_proof_update`] while holding the store's write
//! lock. Two concurrent upgrades therefore cannot interleave, and a slow
//! upgrade that lost the race cannot move a record backward.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use capsule_core::{ProofStatus, Record, RecordId, TimestampProof};
use parking_lot::RwLock;

use crate::error::PipelineError;

/// Persistence for evidence records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Load a record, `None` if absent.
    async fn get(&self, id: &RecordId) -> Result<Option<Record>, PipelineError>;

    /// Insert or replace a record.
    async fn put(&self, record: &Record) -> Result<(), PipelineError>;

    /// Replace the proof of a stored record, refusing status regressions.
    /// Returns the record as stored afterwards.
    async fn update_proof(
        &self,
        id: &RecordId,
        proof: TimestampProof,
        status: ProofStatus,
    ) -> Result<Record, PipelineError>;
}

fn fail(action: &str, path: &Path, e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Records(format!("{action} {}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// FsRecordStore
// ---------------------------------------------------------------------------

/// One pretty-printed JSON file per record, `{root}/{id}.json`.
#[derive(Debug)]
pub struct FsRecordStore {
    root: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FsRecordStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, id: &RecordId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    async fn read(&self, id: &RecordId) -> Result<Option<Record>, PipelineError> {
        let path = self.path_of(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(fail("read", &path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| fail("parse", &path, e))
    }

    /// Write via a temp file and rename so readers never see a torn record.
    async fn write(&self, record: &Record) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| fail("create", &self.root, e))?;
        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| fail("serialize", &self.path_of(&record.id), e))?;
        let path = self.path_of(&record.id);
        let tmp = self.root.join(format!(".{}.json.tmp", record.id));
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| fail("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| fail("rename", &path, e))
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn get(&self, id: &RecordId) -> Result<Option<Record>, PipelineError> {
        self.read(id).await
    }

    async fn put(&self, record: &Record) -> Result<(), PipelineError> {
        let _guard = self.write_lock.lock().await;
        self.write(record).await
    }

    #[tracing::instrument(skip_all, fields(record = %id, status = %status))]
    async fn update_proof(
        &self,
        id: &RecordId,
        proof: TimestampProof,
        status: ProofStatus,
    ) -> Result<Record, PipelineError> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.read(id).await?.ok_or(PipelineError::NotFound(*id))?;
        if record.apply_proof_update(proof, status)? {
            self.write(&record).await?;
            tracing::info!("record proof updated");
        }
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// MemoryRecordStore
// ---------------------------------------------------------------------------

/// Records held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordId, Record>>,
}

impl MemoryRecordStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, id: &RecordId) -> Result<Option<Record>, PipelineError> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn put(&self, record: &Record) -> Result<(), PipelineError> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    async fn update_proof(
        &self,
        id: &RecordId,
        proof: TimestampProof,
        status: ProofStatus,
    ) -> Result<Record, PipelineError> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or(PipelineError::NotFound(*id))?;
        record.apply_proof_update(proof, status)?;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_core::{ContentDigest, SourceDescriptor};

    fn record(status: ProofStatus) -> Record {
        Record::new(
            ContentDigest::from_bytes([3; 32]),
            None,
            TimestampProof::new(vec![1]),
            status,
            SourceDescriptor::file("a.txt", None),
        )
    }

    #[tokio::test]
    async fn memory_store_round_trip_and_monotonic_updates() {
        let store = MemoryRecordStore::new();
        let r = record(ProofStatus::Incomplete);
        store.put(&r).await.unwrap();
        assert_eq!(store.get(&r.id).await.unwrap(), Some(r.clone()));

        let updated = store
            .update_proof(&r.id, TimestampProof::new(vec![2, 2]), ProofStatus::Complete)
            .await
            .unwrap();
        assert_eq!(updated.proof_status, ProofStatus::Complete);

        let err = store
            .update_proof(&r.id, TimestampProof::empty(), ProofStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Core(_)));
        let stored = store.get(&r.id).await.unwrap().unwrap();
        assert_eq!(stored.proof.as_bytes(), &[2, 2]);
    }

    #[tokio::test]
    async fn memory_store_unknown_record() {
        let store = MemoryRecordStore::new();
        let id = RecordId::new();
        assert_eq!(store.get(&id).await.unwrap(), None);
        let err = store
            .update_proof(&id, TimestampProof::empty(), ProofStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(missing) if missing == id));
    }
}
