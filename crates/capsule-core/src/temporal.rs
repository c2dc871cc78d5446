//! # Capture and Anchor Times
//!
//! Record creation times and ledger anchor times share one representation:
//! UTC, whole seconds, rendered `YYYY-MM-DDTHH:MM:SSZ`. Deserialization
//! rejects anything else, so a stored record cannot carry a local offset.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CapsuleError;

/// A UTC instant with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }

    /// From Unix seconds, as carried in a block header.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CapsuleError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| CapsuleError::InvalidTimestamp(format!("{secs} is out of range")))
    }

    /// Unix seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// RFC 3339 with a `Z` suffix and no fractional part.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl FromStr for Timestamp {
    type Err = CapsuleError;

    /// Accepts RFC 3339 in UTC only; `+00:00` is refused along with every
    /// other explicit offset. Fractional seconds are dropped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.ends_with('Z') {
            return Err(CapsuleError::InvalidTimestamp(format!("{s:?} is not UTC (Z)")));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc).trunc_subsecs(0)))
            .map_err(|e| CapsuleError::InvalidTimestamp(format!("{s:?}: {e}")))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
