//! # Blob Storage
//!
//! Content-addressed storage for captured bytes. [`FsBlobStore`] lays
//! content out as `{root}/{sha256 hex}/{filename}`, so storing the same
//! bytes twice yields the same reference.
//!
//! ## Integrity
//!
//! Writes go through a temp file and a rename. A `put` that finds a file
//! already under its digest re-hashes it and rewrites it on mismatch, so a
//! torn or altered copy is repaired rather than vouched for.
//! [`BlobStore::get`] returns whatever is on disk; detecting tampering
//! after capture is the verifier's job.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use capsule_core::{ContentBlob, StorageReference};
use capsule_crypto::sha256_hex;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;
use url::Url;
use uuid::Uuid;

use crate::error::PipelineError;

/// Where captured bytes live.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `blob` and return where it went.
    async fn put(&self, blob: &ContentBlob) -> Result<StorageReference, PipelineError>;

    /// Read back the bytes behind `reference`.
    async fn get(&self, reference: &StorageReference) -> Result<Vec<u8>, PipelineError>;
}

/// Validate a filename hint: a single non-empty path component.
fn validate_filename(filename: &str) -> Result<&str, PipelineError> {
    let name = filename.trim();
    if name.is_empty() {
        return Err(PipelineError::Blob("filename is required".into()));
    }
    if name == "." || name == ".." {
        return Err(PipelineError::Blob(format!("invalid filename {name:?}")));
    }
    if name.len() > 255 {
        return Err(PipelineError::Blob(format!(
            "filename too long: {} bytes (max 255)",
            name.len()
        )));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(PipelineError::Blob(format!(
            "filename {name:?} contains invalid character {c:?}"
        )));
    }
    Ok(name)
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::Blob(format!("{action} {}: {e}", path.display()))
}

// ---------------------------------------------------------------------------
// FsBlobStore
// ---------------------------------------------------------------------------

/// Content-addressed blob store on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// A store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute form of the root, creating it if needed.
    async fn canonical_root(&self) -> Result<PathBuf, PipelineError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("create", &self.root, e))?;
        tokio::fs::canonicalize(&self.root)
            .await
            .map_err(|e| io_error("resolve", &self.root, e))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    #[tracing::instrument(skip_all, fields(filename = %blob.filename, len = blob.bytes.len()))]
    async fn put(&self, blob: &ContentBlob) -> Result<StorageReference, PipelineError> {
        let filename = validate_filename(&blob.filename)?;
        let id = sha256_hex(&blob.bytes);
        let dir = self.canonical_root().await?.join(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, e))?;

        let path = dir.join(filename);
        match tokio::fs::read(&path).await {
            Ok(existing) if sha256_hex(&existing) == id => {
                tracing::debug!(id = %id, "blob already stored");
            }
            Ok(_) => {
                tracing::warn!(id = %id, path = %path.display(), "stored blob does not match its digest; rewriting");
                write_atomically(&dir, &path, &blob.bytes).await?;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_atomically(&dir, &path, &blob.bytes).await?;
                tracing::debug!(id = %id, "blob stored");
            }
            Err(e) => return Err(io_error("read", &path, e)),
        }

        let url = Url::from_file_path(&path)
            .map_err(|()| PipelineError::Blob(format!("no file URL for {}", path.display())))?;
        Ok(StorageReference {
            id,
            url: url.to_string(),
        })
    }

    async fn get(&self, reference: &StorageReference) -> Result<Vec<u8>, PipelineError> {
        let url = Url::parse(&reference.url)
            .map_err(|e| PipelineError::Blob(format!("invalid reference URL {:?}: {e}", reference.url)))?;
        let path = url
            .to_file_path()
            .map_err(|()| PipelineError::Blob(format!("not a file URL: {}", reference.url)))?;
        let root = self.canonical_root().await?;
        let expected_dir = root.join(&reference.id);
        if path.parent() != Some(expected_dir.as_path()) {
            return Err(PipelineError::Blob(format!(
                "reference {} points outside the store",
                reference.url
            )));
        }
        tokio::fs::read(&path)
            .await
            .map_err(|e| io_error("read", &path, e))
    }
}

/// Write `bytes` to a fresh temp file in `dir`, then rename it over `path`,
/// so a failed write never leaves a partial blob under its digest.
async fn write_atomically(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let tmp = dir.join(format!(".{}.tmp", Uuid::new_v4()));
    let result: Result<(), PipelineError> = async {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await
            .map_err(|e| io_error("create", &tmp, e))?;
        file.write_all(bytes).await.map_err(|e| io_error("write", &tmp, e))?;
        file.sync_all().await.map_err(|e| io_error("sync", &tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| io_error("rename", path, e))
    }
    .await;
    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp).await;
    }
    result
}

// ---------------------------------------------------------------------------
// MemoryBlobStore
// ---------------------------------------------------------------------------

/// Blob store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Overwrite the bytes behind `reference` in place.
    pub fn overwrite(&self, reference: &StorageReference, bytes: Vec<u8>) {
        self.blobs.write().insert(reference.url.clone(), bytes);
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, blob: &ContentBlob) -> Result<StorageReference, PipelineError> {
        let filename = validate_filename(&blob.filename)?;
        let id = sha256_hex(&blob.bytes);
        let url = format!("memory://{id}/{filename}");
        self.blobs
            .write()
            .entry(url.clone())
            .or_insert_with(|| blob.bytes.clone());
        Ok(StorageReference { id, url })
    }

    async fn get(&self, reference: &StorageReference) -> Result<Vec<u8>, PipelineError> {
        self.blobs
            .read()
            .get(&reference.url)
            .cloned()
            .ok_or_else(|| PipelineError::Blob(format!("no blob at {}", reference.url)))
    }
}
