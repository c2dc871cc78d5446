//! Detached timestamp files (`.ots`): a header naming the hash of the
//! stamped file, the digest itself, and the proof tree rooted at it.

use capsule_core::ContentDigest;

use super::codec::{write_varuint, Reader};
use super::op::Op;
use super::timestamp::TimestampTree;
use crate::error::ProofError;

/// File magic of a detached timestamp.
pub const HEADER_MAGIC: &[u8] = b"\x00OpenTimestamps\x00\x00Proof\x00\xbf\x89\xe2\xe8\x84\xe8\x92\x94";

const MAJOR_VERSION: u64 = 1;

/// A parsed `.ots` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedTimestampFile {
    hash_op: Op,
    timestamp: TimestampTree,
}

impl DetachedTimestampFile {
    /// A file stamping a SHA-256 digest, with an empty tree.
    pub fn from_digest(digest: &ContentDigest) -> Self {
        Self {
            hash_op: Op::Sha256,
            timestamp: TimestampTree::new(digest.as_bytes().to_vec()),
        }
    }

    /// The hash op that produced the file digest.
    pub fn hash_op(&self) -> &Op {
        &self.hash_op
    }

    /// The digest of the stamped file.
    pub fn file_digest(&self) -> &[u8] {
        self.timestamp.msg()
    }

    /// The committed digest as a [`ContentDigest`], when the file was
    /// stamped with SHA-256.
    pub fn content_digest(&self) -> Option<ContentDigest> {
        match self.hash_op {
            Op::Sha256 => ContentDigest::from_slice(self.file_digest()).ok(),
            _ => None,
        }
    }

    /// The proof tree.
    pub fn timestamp(&self) -> &TimestampTree {
        &self.timestamp
    }

    /// Mutable access to the proof tree.
    pub fn timestamp_mut(&mut self) -> &mut TimestampTree {
        &mut self.timestamp
    }

    /// Parse a detached file; trailing bytes are an error.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, ProofError> {
        if bytes.is_empty() {
            return Err(ProofError::Empty);
        }
        let mut reader = Reader::new(bytes);
        if reader.read_bytes(HEADER_MAGIC.len())? != HEADER_MAGIC {
            return Err(ProofError::Codec("bad file magic".into()));
        }
        let version = reader.read_varuint()?;
        if version != MAJOR_VERSION {
            return Err(ProofError::Codec(format!(
                "unsupported major version {version}"
            )));
        }
        let tag = reader.read_byte()?;
        let hash_op = Op::deserialize_from_tag(&mut reader, tag)?;
        let digest_len = hash_op
            .digest_len()
            .ok_or_else(|| ProofError::Codec(format!("{hash_op} is not a file hash op")))?;
        let digest = reader.read_bytes(digest_len)?.to_vec();
        let timestamp = TimestampTree::deserialize(&mut reader, digest)?;
        reader.assert_eof()?;
        Ok(Self { hash_op, timestamp })
    }

    /// Serialize to `.ots` bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, ProofError> {
        let mut out = HEADER_MAGIC.to_vec();
        write_varuint(&mut out, MAJOR_VERSION);
        self.hash_op.serialize(&mut out);
        out.extend_from_slice(self.file_digest());
        self.timestamp.serialize(&mut out)?;
        Ok(out)
    }

    /// Summary in the `ots info` layout.
    pub fn info(&self) -> String {
        format!(
            "File {} hash: {}\nTimestamp:\n{}",
            self.hash_op,
            hex::encode(self.file_digest()),
            self.timestamp.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ots::Attestation;

    fn stamped(digest: [u8; 32]) -> DetachedTimestampFile {
        let mut file = DetachedTimestampFile::from_digest(&ContentDigest::from_bytes(digest));
        file.timestamp_mut()
            .add_op(Op::Append(vec![0x11; 16]))
            .unwrap()
            .add_op(Op::Sha256)
            .unwrap()
            .add_attestation(Attestation::Pending {
                uri: "https://alice.btc.calendar.opentimestamps.org".into(),
            });
        file
    }

    #[test]
    fn header_layout() {
        let bytes = stamped([7; 32]).serialize().unwrap();
        assert!(bytes.starts_with(HEADER_MAGIC));
        assert_eq!(bytes[HEADER_MAGIC.len()], 0x01);
        assert_eq!(bytes[HEADER_MAGIC.len() + 1], 0x08);
        assert_eq!(&bytes[HEADER_MAGIC.len() + 2..HEADER_MAGIC.len() + 34], &[7; 32]);
    }

    #[test]
    fn parse_serialize_is_byte_exact() {
        let bytes = stamped([3; 32]).serialize().unwrap();
        let parsed = DetachedTimestampFile::deserialize(&bytes).unwrap();
        assert_eq!(parsed.serialize().unwrap(), bytes);
        assert_eq!(
            parsed.content_digest(),
            Some(ContentDigest::from_bytes([3; 32]))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            DetachedTimestampFile::deserialize(&[]),
            Err(ProofError::Empty)
        ));
        assert!(DetachedTimestampFile::deserialize(b"not a proof at all, definitely not").is_err());

        let mut bytes = stamped([3; 32]).serialize().unwrap();
        bytes.push(0x00);
        assert!(DetachedTimestampFile::deserialize(&bytes).is_err());

        let bytes = stamped([3; 32]).serialize().unwrap();
        assert!(DetachedTimestampFile::deserialize(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn rejects_non_hash_file_op() {
        let mut bytes = HEADER_MAGIC.to_vec();
        bytes.extend_from_slice(&[0x01, 0xf2]);
        assert!(DetachedTimestampFile::deserialize(&bytes).is_err());
    }

    #[test]
    fn info_layout() {
        let info = stamped([0; 32]).info();
        assert!(info.starts_with(&format!("File sha256 hash: {}\nTimestamp:\n", "00".repeat(32))));
        assert!(info.contains("PendingAttestation"));
    }
}
