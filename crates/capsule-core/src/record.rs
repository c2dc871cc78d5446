//! # Evidence Records
//!
//! The durable unit of the system: a digest, where the bytes were stored,
//! the timestamp proof, and where the content came from.
//!
//! ## Invariant
//!
//! Once created, a record's proof and status change only through
//! [`Record::apply_proof_update`], which refuses to move the status
//! backward. Everything else is immutable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::ContentDigest;
use crate::error::CapsuleError;
use crate::proof::{ProofStatus, TimestampProof};
use crate::temporal::Timestamp;

/// Raw bytes plus a filename hint, as handed to the blob store.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentBlob {
    /// The content bytes.
    pub bytes: Vec<u8>,
    /// Filename hint used when storing (e.g. `evidence.html`).
    pub filename: String,
}

impl ContentBlob {
    /// Create a blob from bytes and a filename hint.
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }
}

impl fmt::Debug for ContentBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBlob")
            .field("len", &self.bytes.len())
            .field("filename", &self.filename)
            .finish()
    }
}

/// Where the blob store put a piece of content.
///
/// A weak reference: the record does not own the stored bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageReference {
    /// Content-addressed identifier (CID, hex digest, ...).
    pub id: String,
    /// Resolvable retrieval URL.
    pub url: String,
}

/// Unique identifier of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Uuid);

impl RecordId {
    /// Generate a new random record identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| CapsuleError::InvalidRecordId(format!("{s:?}: {e}")))
    }
}

/// What kind of source produced the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// A rendered web page.
    Url,
    /// An uploaded file.
    File,
}

/// Describes where captured content came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source kind.
    pub kind: SourceKind,
    /// The URL or the upload filename.
    pub locator: String,
    /// Document title, falling back to the locator.
    pub title: String,
    /// Meta description, when the document declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SourceDescriptor {
    /// Describe a captured URL. An absent or blank title falls back to the URL.
    pub fn url(url: impl Into<String>, title: Option<String>) -> Self {
        let locator = url.into();
        Self {
            kind: SourceKind::Url,
            title: non_blank(title).unwrap_or_else(|| locator.clone()),
            locator,
            description: None,
        }
    }

    /// Describe an uploaded file.
    pub fn file(filename: impl Into<String>, title: Option<String>) -> Self {
        let locator = filename.into();
        Self {
            kind: SourceKind::File,
            title: non_blank(title).unwrap_or_else(|| locator.clone()),
            locator,
            description: None,
        }
    }

    /// Attach a meta description.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// The durable evidence record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub id: RecordId,
    /// Digest of the sanitized content.
    pub digest: ContentDigest,
    /// Blob store location; absent when the upload failed at capture time.
    pub storage: Option<StorageReference>,
    /// Timestamp proof bytes.
    pub proof: TimestampProof,
    /// Lifecycle status of `proof`.
    pub proof_status: ProofStatus,
    /// Capture time.
    pub created_at: Timestamp,
    /// Content origin.
    pub source: SourceDescriptor,
}

impl Record {
    /// Create a record at the current time with a fresh identifier.
    pub fn new(
        digest: ContentDigest,
        storage: Option<StorageReference>,
        proof: TimestampProof,
        proof_status: ProofStatus,
        source: SourceDescriptor,
    ) -> Self {
        Self {
            id: RecordId::new(),
            digest,
            storage,
            proof,
            proof_status,
            created_at: Timestamp::now(),
            source,
        }
    }

    /// Replace the proof if `status` does not move the record backward.
    ///
    /// Returns `Ok(true)` when the record changed, `Ok(false)` when the
    /// update carried the same status (nothing to persist), and
    /// [`CapsuleError::InvalidTransition`] for a regression.
    pub fn apply_proof_update(
        &mut self,
        proof: TimestampProof,
        status: ProofStatus,
    ) -> Result<bool, CapsuleError> {
        if status < self.proof_status {
            return Err(CapsuleError::InvalidTransition {
                from: self.proof_status,
                to: status,
            });
        }
        if status == self.proof_status {
            return Ok(false);
        }
        self.proof = proof;
        self.proof_status = status;
        Ok(true)
    }
}
