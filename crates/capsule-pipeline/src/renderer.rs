//! Page rendering. The renderer is the only collaborator that fetches the
//! page itself; everything downstream works on the returned document.

use std::time::Duration;

use async_trait::async_trait;
use capsule_sanitize::fetch::USER_AGENT;
use url::Url;

use crate::error::PipelineError;

/// A rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Serialized document.
    pub html: String,
    /// Title reported by the renderer, if it knows one.
    pub title_hint: Option<String>,
    /// URL after redirects; relative references resolve against it.
    pub final_url: String,
}

/// Turns a URL into a document.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url`.
    async fn render(&self, url: &str) -> Result<RenderedPage, PipelineError>;
}

/// [`Renderer`] that performs a plain GET.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    http: reqwest::Client,
}

impl HttpRenderer {
    /// A renderer whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Render {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    #[tracing::instrument(skip(self))]
    async fn render(&self, url: &str) -> Result<RenderedPage, PipelineError> {
        let fail = |reason: String| PipelineError::Render {
            url: url.to_string(),
            reason,
        };
        let parsed = Url::parse(url).map_err(|e| fail(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(fail(format!("unsupported scheme {}", parsed.scheme())));
        }

        let resp = self
            .http
            .get(parsed)
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        if !status.is_success() {
            // A partially loaded page is still evidence of what was served.
            tracing::warn!(%status, "page returned an error status; capturing body anyway");
        }
        let html = resp.text().await.map_err(|e| fail(e.to_string()))?;
        Ok(RenderedPage {
            html,
            title_hint: None,
            final_url,
        })
    }
}
