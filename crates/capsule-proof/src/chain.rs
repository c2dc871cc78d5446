//! Bitcoin block headers, as needed to check a Bitcoin attestation.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ProofError;

/// The parts of a block header an attestation is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block height.
    pub height: u64,
    /// Merkle root in internal byte order (as attested in proofs).
    pub merkle_root: [u8; 32],
    /// Header time, Unix seconds.
    pub time: i64,
}

impl BlockHeader {
    /// Merkle root in the conventional display (reversed) order.
    pub fn merkle_root_display(&self) -> String {
        let mut root = self.merkle_root;
        root.reverse();
        hex::encode(root)
    }
}

/// Source of block headers by height.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Fetch the header of the block at `height`.
    async fn block_header(&self, height: u64) -> Result<BlockHeader, ProofError>;
}

/// [`BlockSource`] backed by an Esplora REST API.
#[derive(Debug, Clone)]
pub struct EsploraBlockSource {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct EsploraBlock {
    height: u64,
    merkle_root: String,
    timestamp: i64,
}

impl EsploraBlockSource {
    /// Build a source for `base_url` (e.g. `https://blockstream.info/api`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProofError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProofError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ProofError> {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProofError::BlockSource(format!("GET {url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(ProofError::BlockSource(format!(
                "GET {url}: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp)
    }
}

#[async_trait]
impl BlockSource for EsploraBlockSource {
    async fn block_header(&self, height: u64) -> Result<BlockHeader, ProofError> {
        let hash = self
            .get(&format!("block-height/{height}"))
            .await?
            .text()
            .await
            .map_err(|e| ProofError::BlockSource(format!("reading block hash: {e}")))?;
        let hash = hash.trim();
        if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ProofError::BlockSource(format!(
                "invalid block hash for height {height}: {hash:?}"
            )));
        }

        let block: EsploraBlock = self
            .get(&format!("block/{hash}"))
            .await?
            .json()
            .await
            .map_err(|e| ProofError::BlockSource(format!("decoding block {hash}: {e}")))?;
        if block.height != height {
            return Err(ProofError::BlockSource(format!(
                "block {hash} is at height {}, expected {height}",
                block.height
            )));
        }

        let mut merkle_root = [0u8; 32];
        hex::decode_to_slice(&block.merkle_root, &mut merkle_root)
            .map_err(|e| ProofError::BlockSource(format!("invalid merkle root: {e}")))?;
        merkle_root.reverse();

        Ok(BlockHeader {
            height,
            merkle_root,
            time: block.timestamp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_root_is_reversed() {
        let mut root = [0u8; 32];
        root[0] = 0xaa;
        let header = BlockHeader {
            height: 1,
            merkle_root: root,
            time: 0,
        };
        assert!(header.merkle_root_display().ends_with("aa"));
    }

    #[tokio::test]
    async fn unreachable_esplora_is_an_error() {
        let source =
            EsploraBlockSource::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        assert!(matches!(
            source.block_header(1).await,
            Err(ProofError::BlockSource(_))
        ));
    }
}
