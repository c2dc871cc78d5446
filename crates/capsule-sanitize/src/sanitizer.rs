//! # Sanitizer
//!
//! Turns a rendered document into a deterministic, self-contained,
//! non-executable snapshot. Passes run in a fixed order:
//!
//! 1. Resource inlining (raster images become `data:` URIs).
//! 2. Active-content removal.
//! 3. Event-handler stripping.
//! 4. Ephemeral-UI removal.
//!
//! Removing an element joins the text on either side of it, and that text
//! can spell new markup (`<<script></script>script>`). Passes 2-4 therefore
//! repeat until the document stops changing, and run once before image
//! discovery so that spliced images are inlined on the first sanitization
//! rather than the second.
//!
//! Non-document uploads pass through untouched.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use capsule_core::ContentBlob;
use futures::stream::{self, StreamExt};
use url::Url;

use crate::error::SanitizeError;
use crate::fetch::ResourceFetcher;
use crate::inline::{data_uri, raster_mime, resolve};
use crate::metadata::extract_metadata;
use crate::rules;

/// Filename given to sanitized documents.
pub const DOCUMENT_FILENAME: &str = "evidence.html";

/// Upper bound on removal rounds before a document is rejected.
pub const MAX_REMOVAL_ROUNDS: usize = 16;

/// Limits for image inlining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerConfig {
    /// Maximum concurrent image fetches.
    pub max_concurrent_fetches: usize,
    /// Deadline of each image fetch.
    pub fetch_timeout: Duration,
    /// Images larger than this stay external.
    pub max_image_bytes: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            fetch_timeout: Duration::from_secs(10),
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Content handed to the sanitizer.
#[derive(Debug, Clone)]
pub enum CaptureInput {
    /// A rendered HTML document.
    Document {
        /// Serialized DOM.
        html: String,
        /// URL relative references resolve against.
        base_url: Option<String>,
        /// Title reported by the renderer, used when the document has none.
        title_hint: Option<String>,
    },
    /// Opaque uploaded bytes.
    Raw {
        /// File content.
        bytes: Vec<u8>,
        /// Upload filename.
        filename: String,
    },
}

/// Sanitizer output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedContent {
    /// The bytes that get hashed and stored.
    pub blob: ContentBlob,
    /// Best-effort title.
    pub title: Option<String>,
    /// Best-effort description.
    pub description: Option<String>,
}

/// Document sanitizer with an injected resource fetcher.
pub struct Sanitizer {
    fetcher: Arc<dyn ResourceFetcher>,
    config: SanitizerConfig,
}

impl std::fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sanitizer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Sanitizer {
    /// Build a sanitizer.
    pub fn new(fetcher: Arc<dyn ResourceFetcher>, config: SanitizerConfig) -> Self {
        Self { fetcher, config }
    }

    /// Sanitize `input`.
    pub async fn sanitize(&self, input: CaptureInput) -> Result<SanitizedContent, SanitizeError> {
        match input {
            CaptureInput::Raw { bytes, filename } => Ok(SanitizedContent {
                blob: ContentBlob::new(bytes, filename),
                title: None,
                description: None,
            }),
            CaptureInput::Document {
                html,
                base_url,
                title_hint,
            } => {
                let base = base_url
                    .as_deref()
                    .map(|raw| {
                        Url::parse(raw).map_err(|e| SanitizeError::InvalidBaseUrl {
                            url: raw.to_string(),
                            reason: e.to_string(),
                        })
                    })
                    .transpose()?;
                let html = self.sanitize_html(&html, base.as_ref()).await?;
                let metadata = extract_metadata(&html)?;
                Ok(SanitizedContent {
                    blob: ContentBlob::new(html.into_bytes(), DOCUMENT_FILENAME),
                    title: metadata.title.or(title_hint),
                    description: metadata.description,
                })
            }
        }
    }

    /// Run the four passes over an HTML string.
    #[tracing::instrument(skip_all, fields(base = base.map(Url::as_str), len = html.len()))]
    pub async fn sanitize_html(&self, html: &str, base: Option<&Url>) -> Result<String, SanitizeError> {
        let settled = remove_until_stable(html)?;
        let inlined = self.inline_resources(&settled, base).await?;
        let html = rules::inline_images(&settled, &inlined)?;
        // Inlining only rewrites `src`/`srcset`, so this round is a no-op
        // unless a removal rule matches on an image attribute.
        remove_until_stable(&html)
    }

    /// Fetch every distinct external image once; map original `src` to its
    /// `data:` replacement for the ones that turned out to be rasters.
    async fn inline_resources(
        &self,
        html: &str,
        base: Option<&Url>,
    ) -> Result<HashMap<String, String>, SanitizeError> {
        let sources = rules::collect_image_sources(html)?;
        let resolved: Vec<(String, Url)> = sources
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|src| resolve(&src, base).map(|url| (src, url)))
            .collect();
        let targets: BTreeSet<Url> = resolved.iter().map(|(_, url)| url.clone()).collect();
        if targets.is_empty() {
            return Ok(HashMap::new());
        }

        let fetched: HashMap<Url, String> = stream::iter(targets)
            .map(|url| async move {
                let embedded = self.fetch_embedded(&url).await;
                (url, embedded)
            })
            .buffer_unordered(self.config.max_concurrent_fetches.max(1))
            .filter_map(|(url, embedded)| async move { embedded.map(|data| (url, data)) })
            .collect()
            .await;

        tracing::debug!(
            images = resolved.len(),
            inlined = fetched.len(),
            "image inlining finished"
        );
        Ok(resolved
            .into_iter()
            .filter_map(|(src, url)| fetched.get(&url).map(|data| (src, data.clone())))
            .collect())
    }

    /// One image as a `data:` URI, or `None` when it must stay external.
    async fn fetch_embedded(&self, url: &Url) -> Option<String> {
        let result = tokio::time::timeout(
            self.config.fetch_timeout,
            self.fetcher.fetch(url, self.config.max_image_bytes),
        )
        .await;
        let resource = match result {
            Ok(Ok(resource)) => resource,
            Ok(Err(e)) => {
                tracing::warn!(url = %url, error = %e, "image fetch failed; left unresolved");
                return None;
            }
            Err(_) => {
                tracing::warn!(url = %url, timeout = ?self.config.fetch_timeout, "image fetch timed out; left unresolved");
                return None;
            }
        };
        match raster_mime(&resource.bytes, resource.content_type.as_deref()) {
            Some(mime) => Some(data_uri(&mime, &resource.bytes)),
            None => {
                tracing::debug!(url = %url, "not a raster image; left unresolved");
                None
            }
        }
    }
}

/// Passes 2-4, repeated until a round leaves the document unchanged.
fn remove_until_stable(html: &str) -> Result<String, SanitizeError> {
    let mut current = html.to_string();
    for round in 1..=MAX_REMOVAL_ROUNDS {
        let next = rules::remove_active_content(&current)?;
        let next = rules::strip_event_handlers(&next)?;
        let next = rules::remove_ephemeral_ui(&next)?;
        if next == current {
            if round > 2 {
                tracing::debug!(rounds = round, "removal settled after re-formed markup");
            }
            return Ok(current);
        }
        current = next;
    }
    Err(SanitizeError::Rewrite(format!(
        "markup still changing after {MAX_REMOVAL_ROUNDS} removal rounds"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `depth` empty scripts, each one splicing the next layer together.
    fn spliced_script(depth: usize) -> String {
        let mut html = "<script>alert(1)</script>".to_string();
        for _ in 0..depth {
            html = html.replace("<script>", "<<script></script>script>");
        }
        html
    }

    #[test]
    fn spliced_script_is_removed_in_later_rounds() {
        let out = remove_until_stable("<p><<script></script>script>alert(1)</script></p>").unwrap();
        assert!(!out.contains("<script"));
        assert!(!out.contains("alert"));
        assert_eq!(remove_until_stable(&out).unwrap(), out);
    }

    #[test]
    fn nested_splices_settle_within_the_round_limit() {
        let out = remove_until_stable(&spliced_script(4)).unwrap();
        assert!(!out.contains("<script"));
        assert!(!out.contains("alert"));
    }

    #[test]
    fn splices_deeper_than_the_round_limit_are_rejected() {
        let err = remove_until_stable(&spliced_script(MAX_REMOVAL_ROUNDS + 4)).unwrap_err();
        assert!(matches!(err, SanitizeError::Rewrite(_)));
    }

    #[test]
    fn clean_documents_take_one_round() {
        let html = "<p>plain <b>text</b></p>";
        assert_eq!(remove_until_stable(html).unwrap(), html);
    }
}
