//! Attestations: the leaves of the proof tree.
//!
//! An attestation claims that the message at its node is committed to by
//! some external authority. Serialized as an 8-byte tag followed by a
//! varbytes payload, so readers can skip tags they do not understand.

use std::cmp::Ordering;
use std::fmt;

use super::codec::{write_varbytes, write_varuint, Reader};
use crate::error::ProofError;

/// Tag of a pending (calendar) attestation.
pub const PENDING_TAG: [u8; 8] = [0x83, 0xdf, 0xe3, 0x0d, 0x2e, 0xf9, 0x0c, 0x8e];
/// Tag of a Bitcoin block-header attestation.
pub const BITCOIN_TAG: [u8; 8] = [0x05, 0x88, 0x96, 0x0d, 0x73, 0xd7, 0x19, 0x01];

/// Maximum payload length of any attestation.
const MAX_PAYLOAD_SIZE: usize = 8192;
/// Maximum length of a pending attestation URI.
pub const MAX_URI_LENGTH: usize = 1000;

/// A claim that the node's message is anchored somewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attestation {
    /// The message was merkleized into the block at `height`; the message is
    /// the block's merkle root in internal byte order.
    Bitcoin {
        /// Block height.
        height: u64,
    },
    /// A calendar has the message and will eventually anchor it.
    Pending {
        /// Calendar base URI to ask for the upgrade.
        uri: String,
    },
    /// A tag this implementation does not interpret, kept verbatim.
    Unknown {
        /// The 8-byte tag.
        tag: [u8; 8],
        /// The raw payload.
        payload: Vec<u8>,
    },
}

impl Attestation {
    /// Whether this attestation anchors into Bitcoin.
    pub fn is_bitcoin(&self) -> bool {
        matches!(self, Self::Bitcoin { .. })
    }

    fn tag(&self) -> [u8; 8] {
        match self {
            Self::Bitcoin { .. } => BITCOIN_TAG,
            Self::Pending { .. } => PENDING_TAG,
            Self::Unknown { tag, .. } => *tag,
        }
    }

    fn tag_and_payload(&self) -> ([u8; 8], Vec<u8>) {
        let mut payload = Vec::new();
        let tag = match self {
            Self::Bitcoin { height } => {
                write_varuint(&mut payload, *height);
                BITCOIN_TAG
            }
            Self::Pending { uri } => {
                write_varbytes(&mut payload, uri.as_bytes());
                PENDING_TAG
            }
            Self::Unknown { tag, payload: raw } => {
                payload.extend_from_slice(raw);
                *tag
            }
        };
        (tag, payload)
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        let (tag, payload) = self.tag_and_payload();
        out.extend_from_slice(&tag);
        write_varbytes(out, &payload);
    }

    pub(crate) fn deserialize(reader: &mut Reader<'_>) -> Result<Self, ProofError> {
        let mut tag = [0u8; 8];
        tag.copy_from_slice(reader.read_bytes(8)?);
        let payload = reader.read_varbytes(0, MAX_PAYLOAD_SIZE)?;
        let mut inner = Reader::new(&payload);
        let attestation = match tag {
            BITCOIN_TAG => Self::Bitcoin {
                height: inner.read_varuint()?,
            },
            PENDING_TAG => {
                let raw = inner.read_varbytes(0, MAX_URI_LENGTH)?;
                Self::Pending {
                    uri: validate_uri(&raw)?,
                }
            }
            _ => {
                return Ok(Self::Unknown { tag, payload });
            }
        };
        inner.assert_eof()?;
        Ok(attestation)
    }
}

/// Pending URIs are restricted to a conservative character set so a hostile
/// proof cannot smuggle arbitrary strings into an HTTP request line.
fn validate_uri(raw: &[u8]) -> Result<String, ProofError> {
    let ok = raw.iter().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'/' | b':')
    });
    if !ok {
        return Err(ProofError::Codec("invalid character in pending URI".into()));
    }
    String::from_utf8(raw.to_vec())
        .map_err(|_| ProofError::Codec("pending URI is not UTF-8".into()))
}

/// Canonical order: by tag, then by decoded value. Heights compare as
/// numbers, not as varuint bytes (129 encodes as `81 01`, 256 as `80 02`).
impl Ord for Attestation {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bitcoin { height: a }, Self::Bitcoin { height: b }) => a.cmp(b),
            (Self::Pending { uri: a }, Self::Pending { uri: b }) => a.cmp(b),
            (
                Self::Unknown { tag: ta, payload: pa },
                Self::Unknown { tag: tb, payload: pb },
            ) => ta.cmp(tb).then_with(|| pa.cmp(pb)),
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

impl PartialOrd for Attestation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Attestation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitcoin { height } => write!(f, "BitcoinBlockHeaderAttestation({height})"),
            Self::Pending { uri } => write!(f, "PendingAttestation('{uri}')"),
            Self::Unknown { tag, payload } => write!(
                f,
                "UnknownAttestation({}, {})",
                hex::encode(tag),
                hex::encode(payload)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(att: &Attestation) -> Vec<u8> {
        let mut out = Vec::new();
        att.serialize(&mut out);
        out
    }

    #[test]
    fn bitcoin_wire_format() {
        let bytes = encode(&Attestation::Bitcoin { height: 358_391 });
        assert_eq!(&bytes[..8], &BITCOIN_TAG);
        assert_eq!(&bytes[8..], &[0x03, 0xf7, 0xef, 0x15]);
        let parsed = Attestation::deserialize(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(parsed, Attestation::Bitcoin { height: 358_391 });
    }

    #[test]
    fn pending_wire_format() {
        let uri = "https://alice.btc.calendar.opentimestamps.org";
        let bytes = encode(&Attestation::Pending { uri: uri.into() });
        assert_eq!(&bytes[..8], &PENDING_TAG);
        assert_eq!(bytes[8] as usize, uri.len() + 1);
        assert_eq!(bytes[9] as usize, uri.len());
        let parsed = Attestation::deserialize(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(parsed, Attestation::Pending { uri: uri.into() });
    }

    #[test]
    fn unknown_tag_is_preserved() {
        let att = Attestation::Unknown {
            tag: [1, 2, 3, 4, 5, 6, 7, 8],
            payload: vec![0xde, 0xad],
        };
        let bytes = encode(&att);
        assert_eq!(
            Attestation::deserialize(&mut Reader::new(&bytes)).unwrap(),
            att
        );
    }

    #[test]
    fn pending_uri_charset_enforced() {
        let bytes = encode(&Attestation::Pending {
            uri: "https://evil.example/\r\nHost: x".into(),
        });
        assert!(Attestation::deserialize(&mut Reader::new(&bytes)).is_err());
    }

    #[test]
    fn trailing_payload_rejected() {
        let mut bytes = BITCOIN_TAG.to_vec();
        bytes.extend_from_slice(&[0x02, 0x01, 0x00]);
        assert!(Attestation::deserialize(&mut Reader::new(&bytes)).is_err());
    }

    #[test]
    fn canonical_order_follows_tag_bytes() {
        let mut atts = vec![
            Attestation::Pending { uri: "https://b".into() },
            Attestation::Bitcoin { height: 7 },
            Attestation::Pending { uri: "https://a".into() },
        ];
        atts.sort();
        assert_eq!(atts[0], Attestation::Bitcoin { height: 7 });
        assert_eq!(atts[1], Attestation::Pending { uri: "https://a".into() });
    }

    #[test]
    fn bitcoin_heights_order_numerically() {
        let mut atts = vec![
            Attestation::Bitcoin { height: 256 },
            Attestation::Bitcoin { height: 129 },
        ];
        atts.sort();
        assert_eq!(atts[0], Attestation::Bitcoin { height: 129 });
        // The wire bytes sort the other way round.
        assert!(encode(&atts[0]) > encode(&atts[1]));
    }

    #[test]
    fn unknown_tags_order_by_tag_then_payload() {
        let low = Attestation::Unknown { tag: [0; 8], payload: vec![9] };
        let high = Attestation::Unknown { tag: [0xff; 8], payload: vec![1] };
        let high_more = Attestation::Unknown { tag: [0xff; 8], payload: vec![2] };
        assert!(low < high);
        assert!(high < high_more);
        assert!(low < Attestation::Bitcoin { height: 1 });
        assert!(Attestation::Pending { uri: "x".into() } < high);
    }

    #[test]
    fn display() {
        assert_eq!(
            Attestation::Bitcoin { height: 1 }.to_string(),
            "BitcoinBlockHeaderAttestation(1)"
        );
    }
}
