//! # Proof Engine
//!
//! Drives a timestamp proof through its lifecycle:
//!
//! ```text
//! PENDING --create success--> INCOMPLETE --upgrade (anchor found)--> COMPLETE
//! PENDING --create failure--> PENDING
//! INCOMPLETE --upgrade, no anchor yet--> INCOMPLETE
//! ```
//!
//! None of the three operations returns an error. Network and protocol
//! failures degrade to a well-defined status or outcome, because capture
//! must persist a record even when the ledger is unreachable and an upgrade
//! that finds nothing is the normal case shortly after creation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use capsule_core::{ContentDigest, ProofStatus, Timestamp, TimestampProof};
use futures::future::join_all;
use rand::RngCore;
use serde::Serialize;

use crate::calendar::{CalendarClient, CalendarWhitelist};
use crate::chain::BlockSource;
use crate::error::ProofError;
use crate::ots::{DetachedTimestampFile, Op, TimestampTree};

/// Calendars submitted to when none are configured.
pub const DEFAULT_CALENDARS: &[&str] = &[
    "https://a.pool.opentimestamps.org",
    "https://b.pool.opentimestamps.org",
    "https://a.pool.eternitywall.com",
];

/// Length of the random nonce appended before submission.
const NONCE_LEN: usize = 16;

/// Message attached to outcomes for records without any proof bytes.
pub const NO_PROOF_MESSAGE: &str = "No timestamp proof available yet";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ProofConfig {
    /// Calendars `create` submits to.
    pub calendars: Vec<String>,
    /// Calendars `upgrade` may contact.
    pub whitelist: CalendarWhitelist,
    /// Calendars that must accept a submission for it to count.
    pub min_calendars: usize,
    /// Deadline of every network call.
    pub timeout: Duration,
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            calendars: DEFAULT_CALENDARS.iter().map(|s| s.to_string()).collect(),
            whitelist: CalendarWhitelist::default_public(),
            min_calendars: 1,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A proof together with its lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofUpdate {
    /// Proof bytes.
    pub proof: TimestampProof,
    /// Status of `proof`.
    pub status: ProofStatus,
}

impl ProofUpdate {
    fn pending() -> Self {
        Self {
            proof: TimestampProof::empty(),
            status: ProofStatus::Pending,
        }
    }

    fn incomplete(proof: TimestampProof) -> Self {
        Self {
            proof,
            status: ProofStatus::Incomplete,
        }
    }
}

/// A confirmed ledger position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anchor {
    /// Block height.
    pub height: u64,
    /// Block header time.
    pub time: Timestamp,
    /// Block merkle root, display order.
    pub merkle_root: String,
}

/// How `verify` classified a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Anchored in a confirmed block.
    Anchored,
    /// Structurally valid, waiting for ledger confirmation.
    PendingConfirmation,
    /// The proof commits to a different digest, or a claimed anchor does
    /// not match its block.
    Mismatch,
    /// The proof bytes cannot be parsed.
    Unreadable,
    /// The record has no proof bytes yet.
    NoProof,
}

/// Result of [`ProofEngine::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationOutcome {
    /// Whether the proof verifies against the supplied digest.
    pub verified: bool,
    /// The confirmed anchor, when one was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    /// Human-readable explanation.
    pub message: String,
    /// Machine-readable classification.
    pub verdict: Verdict,
}

impl VerificationOutcome {
    fn rejected(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verified: false,
            anchor: None,
            message: message.into(),
            verdict,
        }
    }

    /// Outcome for a record that carries no proof bytes.
    pub fn no_proof() -> Self {
        Self::rejected(Verdict::NoProof, NO_PROOF_MESSAGE)
    }
}

/// Creates, upgrades and verifies timestamp proofs.
///
/// Collaborators are injected so tests and offline runs can substitute
/// [`crate::MockLedger`] for the network.
pub struct ProofEngine {
    calendar: Arc<dyn CalendarClient>,
    blocks: Arc<dyn BlockSource>,
    config: ProofConfig,
}

impl std::fmt::Debug for ProofEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProofEngine {
    /// Build an engine from its collaborators.
    pub fn new(
        calendar: Arc<dyn CalendarClient>,
        blocks: Arc<dyn BlockSource>,
        config: ProofConfig,
    ) -> Self {
        Self {
            calendar,
            blocks,
            config,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &ProofConfig {
        &self.config
    }

    /// Submit `digest` to the configured calendars.
    ///
    /// `INCOMPLETE` once at least `min_calendars` accepted; otherwise an
    /// empty proof with `PENDING`.
    #[tracing::instrument(skip_all, fields(digest = %digest))]
    pub async fn create(&self, digest: &ContentDigest) -> ProofUpdate {
        match self.try_create(digest).await {
            Ok(proof) => {
                tracing::info!(bytes = proof.len(), "timestamp proof created");
                ProofUpdate::incomplete(proof)
            }
            Err(e) => {
                tracing::warn!(error = %e, "timestamp submission failed; proof left pending");
                ProofUpdate::pending()
            }
        }
    }

    async fn try_create(&self, digest: &ContentDigest) -> Result<TimestampProof, ProofError> {
        let mut file = DetachedTimestampFile::from_digest(digest);
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let commitment = file
            .timestamp_mut()
            .add_op(Op::Append(nonce.to_vec()))?
            .add_op(Op::Sha256)?
            .msg()
            .to_vec();

        let submissions = self.config.calendars.iter().map(|calendar| {
            let commitment = &commitment;
            async move {
                let result = self
                    .with_timeout(self.calendar.submit(calendar, commitment))
                    .await;
                (calendar, result)
            }
        });

        let node = file
            .timestamp_mut()
            .node_mut(&commitment)
            .ok_or_else(|| ProofError::Merge("commitment node missing".into()))?;
        let mut accepted = 0usize;
        for (calendar, result) in join_all(submissions).await {
            match result.and_then(|tree| node.merge(tree)) {
                Ok(()) => accepted += 1,
                Err(e) => tracing::warn!(calendar = %calendar, error = %e, "calendar submission failed"),
            }
        }

        let required = self.config.min_calendars.max(1);
        if accepted < required {
            return Err(ProofError::InsufficientCalendars { accepted, required });
        }
        Ok(TimestampProof::new(file.serialize()?))
    }

    /// Ask the calendars whether the proof has been anchored.
    ///
    /// Returns the enriched proof with `COMPLETE` when a Bitcoin
    /// attestation is now present, otherwise the original bytes with
    /// `INCOMPLETE`. An empty proof stays `PENDING`: it has nothing to
    /// upgrade and must be resubmitted through [`ProofEngine::create`].
    #[tracing::instrument(skip_all, fields(bytes = proof.len()))]
    pub async fn upgrade(&self, proof: &TimestampProof) -> ProofUpdate {
        if proof.is_empty() {
            return ProofUpdate::pending();
        }
        let mut file = match DetachedTimestampFile::deserialize(proof.as_bytes()) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, "cannot parse proof for upgrade");
                return ProofUpdate::incomplete(proof.clone());
            }
        };
        if file.timestamp().is_complete() {
            return ProofUpdate {
                proof: proof.clone(),
                status: ProofStatus::Complete,
            };
        }

        if !self.upgrade_tree(file.timestamp_mut()).await {
            tracing::debug!("calendars had nothing new");
            return ProofUpdate::incomplete(proof.clone());
        }
        if !file.timestamp().is_complete() {
            tracing::debug!("no confirmed anchor yet");
            return ProofUpdate::incomplete(proof.clone());
        }
        match file.serialize() {
            Ok(bytes) => {
                tracing::info!("timestamp proof upgraded to complete");
                ProofUpdate {
                    proof: TimestampProof::new(bytes),
                    status: ProofStatus::Complete,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot serialize upgraded proof");
                ProofUpdate::incomplete(proof.clone())
            }
        }
    }

    /// Merge whatever the whitelisted calendars know into `tree`. Returns
    /// whether anything was merged; failures are logged and skipped.
    async fn upgrade_tree(&self, tree: &mut TimestampTree) -> bool {
        let pending: Vec<(Vec<u8>, String)> = tree
            .pending_attestations()
            .into_iter()
            .filter(|(_, uri)| match self.config.whitelist.check(uri) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping pending attestation");
                    false
                }
            })
            .collect();

        let fetches = pending.iter().map(|(commitment, uri)| async move {
            let result = self
                .with_timeout(self.calendar.fetch_upgrade(uri, commitment))
                .await;
            (commitment, uri, result)
        });

        let mut changed = false;
        for (commitment, uri, result) in join_all(fetches).await {
            let merged = match result {
                Ok(Some(upgraded)) => match tree.node_mut(commitment) {
                    Some(node) => node.merge(upgraded).map(|()| true),
                    None => Ok(false),
                },
                Ok(None) => Ok(false),
                Err(e) => Err(e),
            };
            match merged {
                Ok(merged) => changed |= merged,
                Err(e) => tracing::warn!(calendar = %uri, error = %e, "calendar upgrade failed"),
            }
        }
        changed
    }

    /// Verify `proof` against `digest`.
    ///
    /// `verified=false` when the proof commits to a different digest, when
    /// a claimed anchor disagrees with its block, or when the proof cannot
    /// be parsed at all. A structurally sound proof with no confirmed
    /// anchor verifies as pending confirmation. Block-source failures are
    /// treated as "still pending".
    #[tracing::instrument(skip_all, fields(digest = %digest))]
    pub async fn verify(&self, proof: &TimestampProof, digest: &ContentDigest) -> VerificationOutcome {
        if proof.is_empty() {
            return VerificationOutcome::no_proof();
        }
        let mut file = match DetachedTimestampFile::deserialize(proof.as_bytes()) {
            Ok(file) => file,
            Err(e) => {
                return VerificationOutcome::rejected(
                    Verdict::Unreadable,
                    format!("Unable to parse timestamp proof: {e}"),
                );
            }
        };

        match file.content_digest() {
            Some(committed) if committed == *digest => {}
            Some(committed) => {
                return VerificationOutcome::rejected(
                    Verdict::Mismatch,
                    format!("Digest mismatch: proof commits to {committed}, expected {digest}"),
                );
            }
            None => {
                return VerificationOutcome::rejected(
                    Verdict::Mismatch,
                    format!(
                        "Digest mismatch: proof commits to a {} digest, expected sha256",
                        file.hash_op()
                    ),
                );
            }
        }

        if !file.timestamp().is_complete() && self.upgrade_tree(file.timestamp_mut()).await {
            tracing::debug!("verifying against calendar answers not yet persisted");
        }

        let mut claims = file.timestamp().bitcoin_attestations();
        claims.sort_by_key(|(_, height)| *height);
        for (root, height) in claims {
            let header = match self.with_timeout(self.blocks.block_header(height)).await {
                Ok(header) => header,
                Err(e) => {
                    tracing::warn!(height, error = %e, "block header unavailable; treating as pending");
                    continue;
                }
            };
            if header.merkle_root[..] != root[..] {
                return VerificationOutcome::rejected(
                    Verdict::Mismatch,
                    format!("Bitcoin attestation does not match the merkle root of block {height}"),
                );
            }
            let time = match Timestamp::from_epoch_secs(header.time) {
                Ok(time) => time,
                Err(e) => {
                    tracing::warn!(height, error = %e, "block header has invalid time; treating as pending");
                    continue;
                }
            };
            return VerificationOutcome {
                verified: true,
                message: format!("Timestamp confirmed in Bitcoin block {height} at {time}"),
                anchor: Some(Anchor {
                    height,
                    time,
                    merkle_root: header.merkle_root_display(),
                }),
                verdict: Verdict::Anchored,
            };
        }

        VerificationOutcome {
            verified: true,
            anchor: None,
            message: "Timestamp submitted, pending confirmation in the Bitcoin blockchain".into(),
            verdict: Verdict::PendingConfirmation,
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, ProofError>
    where
        F: Future<Output = Result<T, ProofError>>,
    {
        tokio::time::timeout(self.config.timeout, fut)
            .await
            .map_err(|_| ProofError::Timeout(self.config.timeout))?
    }
}
