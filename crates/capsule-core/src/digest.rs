//! # Content Digest
//!
//! Defines [`ContentDigest`], the fixed-length commitment over a piece of
//! captured content.
//!
//! ## Invariant
//!
//! A digest is always exactly 32 bytes. Its textual form is 64 lowercase
//! hex characters; parsing accepts either case and surrounding whitespace
//! but always normalizes to lowercase on output.
//!
//! Hashing itself lives in `capsule-crypto`. This module only owns the
//! representation so that every crate agrees on the wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CapsuleError;

/// Length in bytes of every content digest.
pub const DIGEST_LEN: usize = 32;

/// A 32-byte content commitment (SHA-256 output).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_LEN]);

impl ContentDigest {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a digest from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CapsuleError> {
        let arr: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| {
            CapsuleError::InvalidDigest(format!(
                "expected {DIGEST_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CapsuleError> {
        let s = s.trim();
        if s.len() != DIGEST_LEN * 2 {
            return Err(CapsuleError::InvalidDigest(format!(
                "expected {} hex chars, got {}",
                DIGEST_LEN * 2,
                s.len()
            )));
        }
        let bytes = hex::decode(s.to_ascii_lowercase())
            .map_err(|e| CapsuleError::InvalidDigest(format!("invalid hex: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl FromStr for ContentDigest {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
