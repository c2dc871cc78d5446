//! # In-Memory Ledger
//!
//! A deterministic stand-in for both the calendar servers and the block
//! source, for tests and offline runs.
//!
//! Submissions get a pending attestation immediately. [`MockLedger::confirm`]
//! then commits every outstanding submission into one "block": it builds a
//! real SHA-256 merkle tree over them, records the header, and from then on
//! serves upgrade paths that end in a Bitcoin attestation for that block.
//! Proofs produced against the mock therefore go through the exact same
//! parse, merge and verify code as proofs from the network.

use std::collections::HashMap;

use async_trait::async_trait;
use capsule_core::ContentDigest;
use capsule_crypto::node_hash;
use parking_lot::Mutex;

use crate::calendar::CalendarClient;
use crate::chain::{BlockHeader, BlockSource};
use crate::error::ProofError;
use crate::ots::{Attestation, Op, TimestampTree};

#[derive(Debug)]
struct LedgerState {
    available: bool,
    pending: Vec<ContentDigest>,
    upgrades: HashMap<Vec<u8>, TimestampTree>,
    headers: HashMap<u64, BlockHeader>,
    submissions: usize,
}

/// Calendar and block source backed by process memory.
#[derive(Debug)]
pub struct MockLedger {
    state: Mutex<LedgerState>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    /// An available ledger with nothing submitted.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LedgerState {
                available: true,
                pending: Vec::new(),
                upgrades: HashMap::new(),
                headers: HashMap::new(),
                submissions: 0,
            }),
        }
    }

    /// Make every call fail (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.state.lock().available = available;
    }

    /// Number of accepted submissions so far.
    pub fn submissions(&self) -> usize {
        self.state.lock().submissions
    }

    /// Number of submissions not yet confirmed.
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Override the header served for `header.height`.
    pub fn set_header(&self, header: BlockHeader) {
        self.state.lock().headers.insert(header.height, header);
    }

    /// Commit every outstanding submission into the block at `height`.
    pub fn confirm(&self, height: u64, time: i64) -> Result<BlockHeader, ProofError> {
        let mut state = self.state.lock();
        let leaves = std::mem::take(&mut state.pending);
        if leaves.is_empty() {
            return Err(ProofError::Config("no pending submissions to confirm".into()));
        }

        let levels = merkle_levels(leaves.clone());
        let root = levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .ok_or_else(|| ProofError::Config("empty merkle tree".into()))?;

        for (index, leaf) in leaves.iter().enumerate() {
            let path = merkle_path(&levels, index, height, leaf)?;
            state.upgrades.insert(leaf.as_bytes().to_vec(), path);
        }

        let header = BlockHeader {
            height,
            merkle_root: *root.as_bytes(),
            time,
        };
        state.headers.insert(height, header);
        tracing::debug!(height, leaves = leaves.len(), "mock ledger confirmed block");
        Ok(header)
    }

    fn ensure_available(state: &LedgerState, calendar: &str) -> Result<(), ProofError> {
        if state.available {
            Ok(())
        } else {
            Err(ProofError::Calendar {
                url: calendar.to_string(),
                reason: "mock ledger unavailable".into(),
            })
        }
    }
}

/// Every level of the tree, leaves first, reduced the same way as
/// [`capsule_crypto::aggregate`].
fn merkle_levels(leaves: Vec<ContentDigest>) -> Vec<Vec<ContentDigest>> {
    let mut levels = vec![leaves];
    while let Some(level) = levels.last().filter(|l| l.len() > 1) {
        let mut pairs = level.chunks_exact(2);
        let mut next: Vec<ContentDigest> = (&mut pairs).map(|p| node_hash(&p[0], &p[1])).collect();
        next.extend_from_slice(pairs.remainder());
        levels.push(next);
    }
    levels
}

/// Timestamp tree from one leaf up to the root, ending in a Bitcoin
/// attestation.
fn merkle_path(
    levels: &[Vec<ContentDigest>],
    mut index: usize,
    height: u64,
    leaf: &ContentDigest,
) -> Result<TimestampTree, ProofError> {
    let mut tree = TimestampTree::new(leaf.as_bytes().to_vec());
    let mut node = &mut tree;
    for level in &levels[..levels.len().saturating_sub(1)] {
        if index % 2 == 1 {
            let left = level[index - 1].as_bytes().to_vec();
            node = node.add_op(Op::Prepend(left))?.add_op(Op::Sha256)?;
        } else if let Some(right) = level.get(index + 1) {
            node = node
                .add_op(Op::Append(right.as_bytes().to_vec()))?
                .add_op(Op::Sha256)?;
        }
        index /= 2;
    }
    node.add_attestation(Attestation::Bitcoin { height });
    Ok(tree)
}

#[async_trait]
impl CalendarClient for MockLedger {
    async fn submit(&self, calendar: &str, commitment: &[u8]) -> Result<TimestampTree, ProofError> {
        let mut state = self.state.lock();
        Self::ensure_available(&state, calendar)?;

        let mut tree = TimestampTree::new(commitment.to_vec());
        let leaf = tree.add_op(Op::Sha256)?;
        leaf.add_attestation(Attestation::Pending {
            uri: calendar.to_string(),
        });
        let digest = ContentDigest::from_slice(leaf.msg())
            .map_err(|e| ProofError::Op(e.to_string()))?;
        if !state.pending.contains(&digest) && !state.upgrades.contains_key(leaf.msg()) {
            state.pending.push(digest);
        }
        state.submissions += 1;
        Ok(tree)
    }

    async fn fetch_upgrade(
        &self,
        calendar: &str,
        commitment: &[u8],
    ) -> Result<Option<TimestampTree>, ProofError> {
        let state = self.state.lock();
        Self::ensure_available(&state, calendar)?;
        Ok(state.upgrades.get(commitment).cloned())
    }
}

#[async_trait]
impl BlockSource for MockLedger {
    async fn block_header(&self, height: u64) -> Result<BlockHeader, ProofError> {
        let state = self.state.lock();
        if !state.available {
            return Err(ProofError::BlockSource("mock ledger unavailable".into()));
        }
        state
            .headers
            .get(&height)
            .copied()
            .ok_or_else(|| ProofError::BlockSource(format!("no block at height {height}")))
    }
}
