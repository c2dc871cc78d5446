//! # OpenTimestamps Proof Format
//!
//! Binary codec for detached timestamp proofs. A proof is a tree: each
//! node holds a message, edges are [`Op`]s that transform the message, and
//! leaves are [`Attestation`]s naming where the message was anchored.
//!
//! Parsing is strict (bounded recursion, bounded message sizes, no trailing
//! bytes) and serialization is canonical, so `serialize(deserialize(b)) == b`
//! for any proof produced by a conforming calendar.

mod attestation;
pub(crate) mod codec;
mod file;
mod op;
mod timestamp;

pub use attestation::{Attestation, BITCOIN_TAG, MAX_URI_LENGTH, PENDING_TAG};
pub use file::{DetachedTimestampFile, HEADER_MAGIC};
pub use op::{Op, MAX_MSG_LENGTH};
pub use timestamp::{TimestampTree, MAX_RECURSION_DEPTH};

/// Parse a bare timestamp tree rooted at `msg`, as returned by a calendar.
pub fn parse_timestamp(bytes: &[u8], msg: Vec<u8>) -> Result<TimestampTree, crate::ProofError> {
    let mut reader = codec::Reader::new(bytes);
    let tree = TimestampTree::deserialize(&mut reader, msg)?;
    reader.assert_eof()?;
    Ok(tree)
}

/// Serialize a bare timestamp tree.
pub fn serialize_timestamp(tree: &TimestampTree) -> Result<Vec<u8>, crate::ProofError> {
    let mut out = Vec::new();
    tree.serialize(&mut out)?;
    Ok(out)
}
