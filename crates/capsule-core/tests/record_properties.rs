//! Properties of digests and the record lifecycle.

use capsule_core::{
    CapsuleError, ContentDigest, ProofStatus, Record, SourceDescriptor, TimestampProof,
};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = ProofStatus> {
    prop_oneof![
        Just(ProofStatus::Pending),
        Just(ProofStatus::Incomplete),
        Just(ProofStatus::Complete),
    ]
}

fn fresh_record() -> Record {
    Record::new(
        ContentDigest::from_bytes([1; 32]),
        None,
        TimestampProof::default(),
        ProofStatus::Pending,
        SourceDescriptor::file("upload.bin", None),
    )
}

proptest! {
    #[test]
    fn digest_hex_parsing_ignores_case_and_padding(bytes in any::<[u8; 32]>(), upper in any::<bool>()) {
        let digest = ContentDigest::from_bytes(bytes);
        let hex = digest.to_hex();
        prop_assert_eq!(hex.len(), 64);
        prop_assert_eq!(hex.clone(), hex.to_ascii_lowercase());

        let written = if upper { hex.to_ascii_uppercase() } else { hex };
        let parsed = ContentDigest::from_hex(&format!("  {written}\n")).unwrap();
        prop_assert_eq!(parsed, digest);
    }

    #[test]
    fn digest_hex_of_wrong_length_is_rejected(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        prop_assume!(bytes.len() != 32);
        let is_invalid = matches!(
            ContentDigest::from_hex(&hex::encode(&bytes)),
            Err(CapsuleError::InvalidDigest(_))
        );
        prop_assert!(is_invalid);
    }

    #[test]
    fn proof_status_never_regresses(updates in prop::collection::vec((arb_status(), any::<u8>()), 1..20)) {
        let mut record = fresh_record();
        for (status, marker) in updates {
            let before = record.proof_status;
            let before_proof = record.proof.clone();
            match record.apply_proof_update(TimestampProof::new(vec![marker]), status) {
                Ok(true) => {
                    prop_assert!(status > before);
                    prop_assert_eq!(record.proof.as_bytes(), &[marker][..]);
                }
                Ok(false) => {
                    prop_assert_eq!(status, before);
                    prop_assert_eq!(&record.proof, &before_proof);
                }
                Err(CapsuleError::InvalidTransition { from, to }) => {
                    prop_assert!(status < before);
                    prop_assert_eq!((from, to), (before, status));
                    prop_assert_eq!(&record.proof, &before_proof);
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
            prop_assert!(record.proof_status >= before);
        }
    }

    #[test]
    fn records_survive_json(status in arb_status(), proof in prop::collection::vec(any::<u8>(), 0..64)) {
        let mut record = fresh_record();
        let _ = record.apply_proof_update(TimestampProof::new(proof), status);
        let json = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, record);
    }
}
