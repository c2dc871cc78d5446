//! Timestamp operations: the edges of the proof tree.
//!
//! Each op maps the message at one node to the message at its child. Unary
//! ops are hashes and transforms; binary ops carry an argument that is
//! appended or prepended.

use std::cmp::Ordering;
use std::fmt;

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use super::codec::{write_varbytes, Reader};
use crate::error::ProofError;

/// Maximum length of any message produced by an op, and of op arguments.
pub const MAX_MSG_LENGTH: usize = 4096;

const TAG_SHA1: u8 = 0x02;
const TAG_RIPEMD160: u8 = 0x03;
const TAG_SHA256: u8 = 0x08;
const TAG_KECCAK256: u8 = 0x67;
const TAG_APPEND: u8 = 0xf0;
const TAG_PREPEND: u8 = 0xf1;
const TAG_REVERSE: u8 = 0xf2;
const TAG_HEXLIFY: u8 = 0xf3;

/// A single timestamp operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// SHA-1 (legacy; kept for parsing old proofs).
    Sha1,
    /// RIPEMD-160.
    Ripemd160,
    /// SHA-256.
    Sha256,
    /// Keccak-256 (Ethereum flavour, not SHA3-256).
    Keccak256,
    /// `msg || arg`.
    Append(Vec<u8>),
    /// `arg || msg`.
    Prepend(Vec<u8>),
    /// Byte-reverse the message.
    Reverse,
    /// Lowercase hex encoding of the message.
    Hexlify,
}

impl Op {
    /// Wire tag of this op.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Sha1 => TAG_SHA1,
            Self::Ripemd160 => TAG_RIPEMD160,
            Self::Sha256 => TAG_SHA256,
            Self::Keccak256 => TAG_KECCAK256,
            Self::Append(_) => TAG_APPEND,
            Self::Prepend(_) => TAG_PREPEND,
            Self::Reverse => TAG_REVERSE,
            Self::Hexlify => TAG_HEXLIFY,
        }
    }

    /// The binary argument, empty for unary ops.
    pub fn arg(&self) -> &[u8] {
        match self {
            Self::Append(arg) | Self::Prepend(arg) => arg,
            _ => &[],
        }
    }

    /// Digest length for hash ops that may open a detached file.
    pub fn digest_len(&self) -> Option<usize> {
        match self {
            Self::Sha1 | Self::Ripemd160 => Some(20),
            Self::Sha256 | Self::Keccak256 => Some(32),
            _ => None,
        }
    }

    /// Apply the op to `msg`.
    pub fn apply(&self, msg: &[u8]) -> Result<Vec<u8>, ProofError> {
        if msg.len() > MAX_MSG_LENGTH {
            return Err(ProofError::Op(format!(
                "message of {} bytes exceeds {MAX_MSG_LENGTH}",
                msg.len()
            )));
        }
        let out = match self {
            Self::Sha1 => Sha1::digest(msg).to_vec(),
            Self::Ripemd160 => Ripemd160::digest(msg).to_vec(),
            Self::Sha256 => Sha256::digest(msg).to_vec(),
            Self::Keccak256 => Keccak256::digest(msg).to_vec(),
            Self::Append(arg) => [msg, arg.as_slice()].concat(),
            Self::Prepend(arg) => [arg.as_slice(), msg].concat(),
            Self::Reverse => {
                if msg.is_empty() {
                    return Err(ProofError::Op("cannot reverse an empty message".into()));
                }
                msg.iter().rev().copied().collect()
            }
            Self::Hexlify => {
                if msg.is_empty() {
                    return Err(ProofError::Op("cannot hexlify an empty message".into()));
                }
                hex::encode(msg).into_bytes()
            }
        };
        if out.len() > MAX_MSG_LENGTH {
            return Err(ProofError::Op(format!(
                "{self} result of {} bytes exceeds {MAX_MSG_LENGTH}",
                out.len()
            )));
        }
        Ok(out)
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        out.push(self.tag());
        if let Self::Append(arg) | Self::Prepend(arg) = self {
            write_varbytes(out, arg);
        }
    }

    pub(crate) fn deserialize_from_tag(reader: &mut Reader<'_>, tag: u8) -> Result<Self, ProofError> {
        Ok(match tag {
            TAG_SHA1 => Self::Sha1,
            TAG_RIPEMD160 => Self::Ripemd160,
            TAG_SHA256 => Self::Sha256,
            TAG_KECCAK256 => Self::Keccak256,
            TAG_APPEND => Self::Append(reader.read_varbytes(1, MAX_MSG_LENGTH)?),
            TAG_PREPEND => Self::Prepend(reader.read_varbytes(1, MAX_MSG_LENGTH)?),
            TAG_REVERSE => Self::Reverse,
            TAG_HEXLIFY => Self::Hexlify,
            other => return Err(ProofError::Codec(format!("unknown op tag 0x{other:02x}"))),
        })
    }
}

impl Ord for Op {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag()
            .cmp(&other.tag())
            .then_with(|| self.arg().cmp(other.arg()))
    }
}

impl PartialOrd for Op {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => f.write_str("sha1"),
            Self::Ripemd160 => f.write_str("ripemd160"),
            Self::Sha256 => f.write_str("sha256"),
            Self::Keccak256 => f.write_str("keccak256"),
            Self::Append(arg) => write!(f, "append {}", hex::encode(arg)),
            Self::Prepend(arg) => write!(f, "prepend {}", hex::encode(arg)),
            Self::Reverse => f.write_str("reverse"),
            Self::Hexlify => f.write_str("hexlify"),
        }
    }
}
