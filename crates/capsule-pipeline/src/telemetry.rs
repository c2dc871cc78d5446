//! Metric names and the helpers that bump them. No recorder is installed
//! here; whichever the host process installs receives the counters.

use capsule_core::ProofStatus;

/// Captures, labelled by resulting proof status.
pub const CAPTURES_TOTAL: &str = "capsule_captures_total";

/// Proof upgrade attempts, labelled by resulting status.
pub const PROOF_UPGRADES_TOTAL: &str = "capsule_proof_upgrades_total";

/// Record verifications, labelled `verified` or `failed`.
pub const VERIFICATIONS_TOTAL: &str = "capsule_verifications_total";

pub(crate) fn capture(status: ProofStatus) {
    metrics::counter!(CAPTURES_TOTAL, "status" => status.as_str()).increment(1);
}

pub(crate) fn proof_upgrade(status: ProofStatus) {
    metrics::counter!(PROOF_UPGRADES_TOTAL, "status" => status.as_str()).increment(1);
}

pub(crate) fn verification(fully_verified: bool) {
    let result = if fully_verified { "verified" } else { "failed" };
    metrics::counter!(VERIFICATIONS_TOTAL, "result" => result).increment(1);
}
