//! Resource fetching for image inlining.
//!
//! The sanitizer never reaches the network on its own; it is handed a
//! [`ResourceFetcher`]. Production uses [`HttpFetcher`].

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::SanitizeError;

/// Browser-like user agent; some CDNs refuse bare clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A fetched resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResource {
    /// Body bytes.
    pub bytes: Vec<u8>,
    /// `Content-Type` header value, if any.
    pub content_type: Option<String>,
}

/// Fetches the bytes behind a URL.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetch `url`, refusing bodies larger than `max_bytes`.
    async fn fetch(&self, url: &Url, max_bytes: usize) -> Result<FetchedResource, SanitizeError>;
}

/// [`ResourceFetcher`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, SanitizeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SanitizeError::Fetch {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, max_bytes: usize) -> Result<FetchedResource, SanitizeError> {
        let fail = |reason: String| SanitizeError::Fetch {
            url: url.to_string(),
            reason,
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme {}", url.scheme())));
        }

        let mut resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(fail(format!("HTTP {}", resp.status())));
        }
        let too_large = || SanitizeError::TooLarge {
            url: url.to_string(),
            limit: max_bytes,
        };
        if resp.content_length().is_some_and(|len| len > max_bytes as u64) {
            return Err(too_large());
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| fail(e.to_string()))? {
            if bytes.len() + chunk.len() > max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }
}
