//! # Calendar Servers
//!
//! Calendars accept commitments, return a pending timestamp immediately, and
//! later serve the upgraded timestamp once they have aggregated the
//! commitment into a Bitcoin transaction.
//!
//! ## Protocol
//!
//! - `POST <calendar>/digest` with the raw commitment as body. The response
//!   body is a serialized timestamp tree rooted at the commitment.
//! - `GET <calendar>/timestamp/<hex commitment>`: `200` with the upgraded
//!   tree, `404` while the calendar has nothing newer.
//!
//! Both requests send `Accept: application/vnd.opentimestamps.v1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::error::ProofError;
use crate::ots::{parse_timestamp, TimestampTree};

/// Media type of serialized timestamps.
pub const OTS_MEDIA_TYPE: &str = "application/vnd.opentimestamps.v1";

/// Upper bound on a calendar response body.
const MAX_RESPONSE_BYTES: usize = 10_000;

/// Client for the calendar protocol.
///
/// Implementations must be safe to share across tasks; the engine holds
/// one behind an `Arc`.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// Submit `commitment` to `calendar`, returning the calendar's
    /// (pending) timestamp rooted at `commitment`.
    async fn submit(&self, calendar: &str, commitment: &[u8]) -> Result<TimestampTree, ProofError>;

    /// Ask `calendar` for a newer timestamp of `commitment`. `Ok(None)`
    /// means the calendar has nothing new yet.
    async fn fetch_upgrade(
        &self,
        calendar: &str,
        commitment: &[u8],
    ) -> Result<Option<TimestampTree>, ProofError>;
}

/// HTTP implementation of [`CalendarClient`].
#[derive(Debug, Clone)]
pub struct HttpCalendarClient {
    http: reqwest::Client,
}

impl HttpCalendarClient {
    /// Build a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProofError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("capsule/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProofError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    fn endpoint(calendar: &str, path: &str) -> String {
        format!("{}/{path}", calendar.trim_end_matches('/'))
    }

    async fn read_body(
        calendar: &str,
        resp: reqwest::Response,
    ) -> Result<Vec<u8>, ProofError> {
        let body = resp.bytes().await.map_err(|e| ProofError::Calendar {
            url: calendar.to_string(),
            reason: format!("failed to read body: {e}"),
        })?;
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(ProofError::Calendar {
                url: calendar.to_string(),
                reason: format!("response of {} bytes too large", body.len()),
            });
        }
        Ok(body.to_vec())
    }
}

fn transport_error(calendar: &str, e: reqwest::Error) -> ProofError {
    ProofError::Calendar {
        url: calendar.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl CalendarClient for HttpCalendarClient {
    async fn submit(&self, calendar: &str, commitment: &[u8]) -> Result<TimestampTree, ProofError> {
        let resp = self
            .http
            .post(Self::endpoint(calendar, "digest"))
            .header(reqwest::header::ACCEPT, OTS_MEDIA_TYPE)
            .body(commitment.to_vec())
            .send()
            .await
            .map_err(|e| transport_error(calendar, e))?;

        if !resp.status().is_success() {
            return Err(ProofError::Calendar {
                url: calendar.to_string(),
                reason: format!("HTTP {}", resp.status()),
            });
        }
        let body = Self::read_body(calendar, resp).await?;
        parse_timestamp(&body, commitment.to_vec())
    }

    async fn fetch_upgrade(
        &self,
        calendar: &str,
        commitment: &[u8],
    ) -> Result<Option<TimestampTree>, ProofError> {
        let path = format!("timestamp/{}", hex::encode(commitment));
        let resp = self
            .http
            .get(Self::endpoint(calendar, &path))
            .header(reqwest::header::ACCEPT, OTS_MEDIA_TYPE)
            .send()
            .await
            .map_err(|e| transport_error(calendar, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = Self::read_body(calendar, resp).await?;
                parse_timestamp(&body, commitment.to_vec()).map(Some)
            }
            status => Err(ProofError::Calendar {
                url: calendar.to_string(),
                reason: format!("HTTP {status}"),
            }),
        }
    }
}

/// Calendars a pending attestation may send us to.
///
/// Entries are host patterns, optionally with a scheme and port:
/// `*.calendar.opentimestamps.org`, `https://a.pool.eternitywall.com`,
/// `http://127.0.0.1:8080`. A leading `*.` matches any subdomain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarWhitelist {
    entries: Vec<WhitelistEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WhitelistEntry {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
}

impl CalendarWhitelist {
    /// Parse whitelist entries.
    pub fn new<I, S>(entries: I) -> Result<Self, ProofError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|e| WhitelistEntry::parse(e.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// Default public calendars.
    pub fn default_public() -> Self {
        Self {
            entries: DEFAULT_WHITELIST
                .iter()
                .filter_map(|e| WhitelistEntry::parse(e).ok())
                .collect(),
        }
    }

    /// Whether `uri` names a whitelisted calendar.
    pub fn allows(&self, uri: &str) -> bool {
        let Ok(url) = Url::parse(uri) else {
            return false;
        };
        let Some(host) = url.host_str() else {
            return false;
        };
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        self.entries.iter().any(|e| e.matches(&url, host))
    }

    /// Error unless `uri` is whitelisted.
    pub fn check(&self, uri: &str) -> Result<(), ProofError> {
        if self.allows(uri) {
            Ok(())
        } else {
            Err(ProofError::NotWhitelisted(uri.to_string()))
        }
    }
}

/// Whitelist used when none is configured.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "*.calendar.opentimestamps.org",
    "*.calendar.eternitywall.com",
    "*.calendar.catallaxy.com",
    "*.pool.opentimestamps.org",
    "*.pool.eternitywall.com",
];

impl WhitelistEntry {
    fn parse(raw: &str) -> Result<Self, ProofError> {
        let raw = raw.trim();
        let (scheme, rest) = match raw.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, raw),
        };
        let rest = rest.trim_end_matches('/');
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    ProofError::Config(format!("invalid port in whitelist entry {raw:?}"))
                })?;
                (host, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() || host.contains('/') {
            return Err(ProofError::Config(format!(
                "invalid whitelist entry {raw:?}"
            )));
        }
        Ok(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
        })
    }

    fn matches(&self, url: &Url, host: &str) -> bool {
        if let Some(scheme) = &self.scheme {
            if scheme != url.scheme() {
                return false;
            }
        }
        if let Some(port) = self.port {
            if url.port_or_known_default() != Some(port) {
                return false;
            }
        }
        let host = host.to_ascii_lowercase();
        match self.host.strip_prefix("*.") {
            Some(suffix) => host
                .strip_suffix(suffix)
                .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
            None => host == self.host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_whitelist_matches_public_calendars() {
        let wl = CalendarWhitelist::default_public();
        assert!(wl.allows("https://alice.btc.calendar.opentimestamps.org"));
        assert!(wl.allows("https://a.pool.opentimestamps.org"));
        assert!(wl.allows("https://finney.calendar.eternitywall.com"));
        assert!(!wl.allows("https://calendar.opentimestamps.org.evil.com"));
        assert!(!wl.allows("https://pool.opentimestamps.org"));
        assert!(!wl.allows("ftp://a.pool.opentimestamps.org"));
        assert!(!wl.allows("not a url"));
    }

    #[test]
    fn explicit_host_and_port() {
        let wl = CalendarWhitelist::new(["http://127.0.0.1:8080"]).unwrap();
        assert!(wl.allows("http://127.0.0.1:8080"));
        assert!(!wl.allows("http://127.0.0.1:8081"));
        assert!(!wl.allows("https://127.0.0.1:8080"));
        assert!(wl.check("http://127.0.0.1:9").is_err());
    }

    #[test]
    fn invalid_entries_rejected() {
        assert!(CalendarWhitelist::new(["http://host:notaport"]).is_err());
        assert!(CalendarWhitelist::new([""]).is_err());
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        assert_eq!(
            HttpCalendarClient::endpoint("https://cal.example/", "digest"),
            "https://cal.example/digest"
        );
    }
}
