//! # Configuration
//!
//! Read from `CAPSULE_*` environment variables, each with a default so an
//! empty environment yields a working setup against the public calendars.

use std::path::PathBuf;
use std::time::Duration;

use capsule_proof::{CalendarWhitelist, ProofConfig, DEFAULT_CALENDARS};
use capsule_sanitize::SanitizerConfig;
use url::Url;

use crate::error::ConfigError;

/// Default Esplora API endpoint for block headers.
pub const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/api";

/// Default data directory.
pub const DEFAULT_DATA_DIR: &str = "./capsule-data";

const DEFAULT_WHITELIST: &str = "*.calendar.opentimestamps.org,*.calendar.eternitywall.com,\
*.calendar.catallaxy.com,*.pool.opentimestamps.org,*.pool.eternitywall.com";

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Calendars proofs are submitted to.
    pub calendars: Vec<String>,
    /// Calendars upgrades may contact.
    pub calendar_whitelist: Vec<String>,
    /// Calendars that must accept a submission.
    pub min_calendars: usize,
    /// Esplora base URL.
    pub esplora_url: String,
    /// Deadline for calendar, block-source and renderer calls.
    pub http_timeout: Duration,
    /// Deadline for each image fetch during sanitization.
    pub fetch_timeout: Duration,
    /// Parallel image fetches during sanitization.
    pub max_concurrent_fetches: usize,
    /// Root of the blob and record stores.
    pub data_dir: PathBuf,
    /// HTTP gateway that serves the blob directory, if one is deployed.
    pub blob_gateway: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            calendars: DEFAULT_CALENDARS.iter().map(|s| s.to_string()).collect(),
            calendar_whitelist: split_list(DEFAULT_WHITELIST),
            min_calendars: 1,
            esplora_url: DEFAULT_ESPLORA_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(10),
            max_concurrent_fetches: 8,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            blob_gateway: None,
        }
    }
}

impl PipelineConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load through an arbitrary variable lookup. Unset or blank
    /// variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("CAPSULE_CALENDARS") {
            config.calendars = split_list(&raw);
        }
        if let Some(raw) = get("CAPSULE_CALENDAR_WHITELIST") {
            config.calendar_whitelist = split_list(&raw);
        }
        if let Some(raw) = get("CAPSULE_MIN_CALENDARS") {
            config.min_calendars = parse_number("CAPSULE_MIN_CALENDARS", &raw)?;
        }
        if let Some(raw) = get("CAPSULE_ESPLORA_URL") {
            config.esplora_url = raw.trim().trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("CAPSULE_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse_number("CAPSULE_HTTP_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("CAPSULE_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout =
                Duration::from_secs(parse_number("CAPSULE_FETCH_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("CAPSULE_MAX_CONCURRENT_FETCHES") {
            config.max_concurrent_fetches = parse_number("CAPSULE_MAX_CONCURRENT_FETCHES", &raw)?;
        }
        if let Some(raw) = get("CAPSULE_DATA_DIR") {
            config.data_dir = PathBuf::from(raw.trim());
        }
        if let Some(raw) = get("CAPSULE_BLOB_GATEWAY") {
            config.blob_gateway = Some(raw.trim().to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calendars.is_empty() {
            return Err(invalid("CAPSULE_CALENDARS", "", "at least one calendar is required"));
        }
        for calendar in &self.calendars {
            check_http_url("CAPSULE_CALENDARS", calendar)?;
        }
        check_http_url("CAPSULE_ESPLORA_URL", &self.esplora_url)?;
        if let Some(gateway) = &self.blob_gateway {
            check_http_url("CAPSULE_BLOB_GATEWAY", gateway)?;
        }
        if self.min_calendars == 0 || self.min_calendars > self.calendars.len() {
            return Err(invalid(
                "CAPSULE_MIN_CALENDARS",
                &self.min_calendars.to_string(),
                &format!("must be between 1 and {}", self.calendars.len()),
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(invalid("CAPSULE_HTTP_TIMEOUT_SECS", "0", "must be positive"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(invalid("CAPSULE_FETCH_TIMEOUT_SECS", "0", "must be positive"));
        }
        if self.max_concurrent_fetches == 0 {
            return Err(invalid("CAPSULE_MAX_CONCURRENT_FETCHES", "0", "must be positive"));
        }
        self.whitelist().map(|_| ())
    }

    /// Parsed calendar whitelist.
    pub fn whitelist(&self) -> Result<CalendarWhitelist, ConfigError> {
        CalendarWhitelist::new(&self.calendar_whitelist).map_err(|e| {
            invalid(
                "CAPSULE_CALENDAR_WHITELIST",
                &self.calendar_whitelist.join(","),
                &e.to_string(),
            )
        })
    }

    /// Settings for the proof engine.
    pub fn proof_config(&self) -> Result<ProofConfig, ConfigError> {
        Ok(ProofConfig {
            calendars: self.calendars.clone(),
            whitelist: self.whitelist()?,
            min_calendars: self.min_calendars,
            timeout: self.http_timeout,
        })
    }

    /// Settings for the sanitizer.
    pub fn sanitizer_config(&self) -> SanitizerConfig {
        SanitizerConfig {
            max_concurrent_fetches: self.max_concurrent_fetches,
            fetch_timeout: self.fetch_timeout,
            ..SanitizerConfig::default()
        }
    }

    /// Directory of the content-addressed blob store.
    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    /// Directory of the record store.
    pub fn record_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect()
}

fn parse_number<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, raw, &e.to_string()))
}

fn check_http_url(var: &'static str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid(var, raw, &e.to_string()))?;
    if matches!(url.scheme(), "http" | "https") {
        Ok(())
    } else {
        Err(invalid(var, raw, "expected an http(s) URL"))
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<PipelineConfig, ConfigError> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|var| env.get(var).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.calendars.len(), 3);
        assert_eq!(config.calendar_whitelist.len(), 5);
        assert_eq!(config.blob_dir(), PathBuf::from("./capsule-data/blobs"));
        let proof = config.proof_config().unwrap();
        assert!(proof.whitelist.allows("https://a.pool.opentimestamps.org"));
        assert!(!proof.whitelist.allows("https://evil.example.com"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("CAPSULE_CALENDARS", " http://127.0.0.1:8080/ , https://b.example.org "),
            ("CAPSULE_CALENDAR_WHITELIST", "http://127.0.0.1:8080"),
            ("CAPSULE_MIN_CALENDARS", "2"),
            ("CAPSULE_ESPLORA_URL", "http://127.0.0.1:3000/api/"),
            ("CAPSULE_HTTP_TIMEOUT_SECS", "5"),
            ("CAPSULE_FETCH_TIMEOUT_SECS", "2"),
            ("CAPSULE_MAX_CONCURRENT_FETCHES", "3"),
            ("CAPSULE_DATA_DIR", "/var/lib/capsule"),
            ("CAPSULE_BLOB_GATEWAY", " https://blobs.example.org/ "),
        ])
        .unwrap();
        assert_eq!(
            config.calendars,
            vec!["http://127.0.0.1:8080", "https://b.example.org"]
        );
        assert_eq!(config.min_calendars, 2);
        assert_eq!(config.esplora_url, "http://127.0.0.1:3000/api");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.sanitizer_config().max_concurrent_fetches, 3);
        assert_eq!(config.sanitizer_config().fetch_timeout, Duration::from_secs(2));
        assert_eq!(config.record_dir(), PathBuf::from("/var/lib/capsule/records"));
        assert_eq!(config.blob_gateway.as_deref(), Some("https://blobs.example.org/"));
        assert!(config
            .proof_config()
            .unwrap()
            .whitelist
            .allows("http://127.0.0.1:8080"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("CAPSULE_MIN_CALENDARS", "  "), ("CAPSULE_CALENDARS", "")]).unwrap();
        assert_eq!(config.min_calendars, 1);
        assert_eq!(config.calendars.len(), 3);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases: &[(&str, &str)] = &[
            ("CAPSULE_MIN_CALENDARS", "many"),
            ("CAPSULE_MIN_CALENDARS", "0"),
            ("CAPSULE_MIN_CALENDARS", "4"),
            ("CAPSULE_HTTP_TIMEOUT_SECS", "-1"),
            ("CAPSULE_HTTP_TIMEOUT_SECS", "0"),
            ("CAPSULE_MAX_CONCURRENT_FETCHES", "0"),
            ("CAPSULE_CALENDARS", "ftp://calendar.example.org"),
            ("CAPSULE_ESPLORA_URL", "not a url"),
            ("CAPSULE_BLOB_GATEWAY", "ipfs://bafy"),
        ];
        for (var, value) in cases {
            let err = load(&[(var, value)]).unwrap_err();
            let ConfigError::Invalid { var: reported, .. } = err;
            assert_eq!(reported, *var, "{var}={value}");
        }
    }
}
