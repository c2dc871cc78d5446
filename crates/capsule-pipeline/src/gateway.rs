//! # Gateway-Served Blobs
//!
//! Deployments that publish the blob directory behind an HTTP gateway hand
//! out gateway URLs (`{gateway}/{sha256 hex}/{filename}`), and verification
//! reads the bytes back over HTTP the same way a third party would.
//! Writes still go to the wrapped store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use capsule_core::{ContentBlob, StorageReference};
use capsule_sanitize::fetch::USER_AGENT;
use url::Url;

use crate::blob::BlobStore;
use crate::error::PipelineError;

/// [`BlobStore`] that writes through `inner` and reads over HTTP.
pub struct GatewayBlobStore {
    inner: Arc<dyn BlobStore>,
    gateway: Url,
    http: reqwest::Client,
}

impl std::fmt::Debug for GatewayBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBlobStore")
            .field("gateway", &self.gateway.as_str())
            .finish_non_exhaustive()
    }
}

impl GatewayBlobStore {
    /// Wrap `inner`, serving its blobs from `gateway`. Reads time out after
    /// `timeout`.
    pub fn new(inner: Arc<dyn BlobStore>, gateway: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let mut gateway = Url::parse(gateway)
            .map_err(|e| PipelineError::Blob(format!("invalid gateway URL {gateway:?}: {e}")))?;
        if !matches!(gateway.scheme(), "http" | "https") {
            return Err(PipelineError::Blob(format!(
                "gateway must be http(s), got {}",
                gateway.scheme()
            )));
        }
        if !gateway.path().ends_with('/') {
            let path = format!("{}/", gateway.path());
            gateway.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Blob(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            inner,
            gateway,
            http,
        })
    }

    /// Gateway URL of a stored blob.
    pub fn url_for(&self, id: &str, filename: &str) -> Result<Url, PipelineError> {
        let mut url = self.gateway.clone();
        url.path_segments_mut()
            .map_err(|()| PipelineError::Blob(format!("gateway {} cannot hold paths", self.gateway)))?
            .pop_if_empty()
            .push(id)
            .push(filename);
        Ok(url)
    }

    /// Whether the gateway currently serves `reference` (HEAD request).
    pub async fn is_accessible(&self, reference: &StorageReference) -> bool {
        let Ok(url) = self.served_url(reference) else {
            return false;
        };
        match self.http.head(url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %reference.url, error = %e, "gateway HEAD failed");
                false
            }
        }
    }

    /// Parse `reference.url`, refusing anything outside the gateway.
    fn served_url(&self, reference: &StorageReference) -> Result<Url, PipelineError> {
        let url = Url::parse(&reference.url).map_err(|e| {
            PipelineError::Blob(format!("invalid reference URL {:?}: {e}", reference.url))
        })?;
        if !url.as_str().starts_with(self.gateway.as_str()) {
            return Err(PipelineError::Blob(format!(
                "reference {} is not served by {}",
                reference.url, self.gateway
            )));
        }
        Ok(url)
    }
}

#[async_trait]
impl BlobStore for GatewayBlobStore {
    async fn put(&self, blob: &ContentBlob) -> Result<StorageReference, PipelineError> {
        let stored = self.inner.put(blob).await?;
        let url = self.url_for(&stored.id, blob.filename.trim())?;
        Ok(StorageReference {
            id: stored.id,
            url: url.to_string(),
        })
    }

    #[tracing::instrument(skip_all, fields(url = %reference.url))]
    async fn get(&self, reference: &StorageReference) -> Result<Vec<u8>, PipelineError> {
        let url = self.served_url(reference)?;
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::Blob(format!("gateway request for {} timed out", reference.url))
            } else {
                PipelineError::Blob(format!("gateway request for {} failed: {e}", reference.url))
            }
        })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Blob(format!(
                "gateway returned {status} for {}",
                reference.url
            )));
        }
        let bytes = resp.bytes().await.map_err(|e| {
            PipelineError::Blob(format!("gateway body for {} unreadable: {e}", reference.url))
        })?;
        Ok(bytes.to_vec())
    }
}
