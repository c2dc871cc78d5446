//! The proof tree.
//!
//! A node holds a message, the attestations made about that message, and
//! the ops leading to child nodes. Children are keyed by op so that two
//! proofs for the same message merge structurally.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use super::attestation::Attestation;
use super::codec::Reader;
use super::op::Op;
use crate::error::ProofError;

/// Maximum nesting of ops below the root.
pub const MAX_RECURSION_DEPTH: usize = 256;

const TAG_ATTESTATION: u8 = 0x00;
const TAG_FORK: u8 = 0xff;

/// A timestamp proof tree rooted at `msg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampTree {
    msg: Vec<u8>,
    attestations: BTreeSet<Attestation>,
    ops: BTreeMap<Op, TimestampTree>,
}

impl TimestampTree {
    /// A bare node for `msg`.
    pub fn new(msg: Vec<u8>) -> Self {
        Self {
            msg,
            attestations: BTreeSet::new(),
            ops: BTreeMap::new(),
        }
    }

    /// The message at this node.
    pub fn msg(&self) -> &[u8] {
        &self.msg
    }

    /// Attestations directly on this node.
    pub fn attestations(&self) -> impl Iterator<Item = &Attestation> {
        self.attestations.iter()
    }

    /// Child edges of this node.
    pub fn ops(&self) -> impl Iterator<Item = (&Op, &TimestampTree)> {
        self.ops.iter()
    }

    /// Whether the node carries neither attestations nor ops.
    pub fn is_empty(&self) -> bool {
        self.attestations.is_empty() && self.ops.is_empty()
    }

    /// Attest the message at this node.
    pub fn add_attestation(&mut self, attestation: Attestation) {
        self.attestations.insert(attestation);
    }

    /// Follow `op` from this node, creating the child if absent.
    pub fn add_op(&mut self, op: Op) -> Result<&mut TimestampTree, ProofError> {
        if !self.ops.contains_key(&op) {
            let child = TimestampTree::new(op.apply(&self.msg)?);
            self.ops.insert(op.clone(), child);
        }
        self.ops
            .get_mut(&op)
            .ok_or_else(|| ProofError::Op(format!("{op} vanished after insert")))
    }

    /// Merge every attestation and op of `other` into `self`.
    ///
    /// Both trees must be rooted at the same message.
    pub fn merge(&mut self, other: TimestampTree) -> Result<(), ProofError> {
        if self.msg != other.msg {
            return Err(ProofError::Merge(format!(
                "messages differ: {} vs {}",
                hex::encode(&self.msg),
                hex::encode(&other.msg)
            )));
        }
        self.attestations.extend(other.attestations);
        for (op, child) in other.ops {
            self.add_op(op)?.merge(child)?;
        }
        Ok(())
    }

    /// Every `(message, attestation)` pair in the tree, depth first.
    pub fn all_attestations(&self) -> Vec<(&[u8], &Attestation)> {
        let mut out = Vec::new();
        self.collect_attestations(&mut out);
        out
    }

    fn collect_attestations<'a>(&'a self, out: &mut Vec<(&'a [u8], &'a Attestation)>) {
        out.extend(self.attestations.iter().map(|a| (self.msg.as_slice(), a)));
        for child in self.ops.values() {
            child.collect_attestations(out);
        }
    }

    /// `(commitment, calendar uri)` for every pending attestation.
    pub fn pending_attestations(&self) -> Vec<(Vec<u8>, String)> {
        self.all_attestations()
            .into_iter()
            .filter_map(|(msg, att)| match att {
                Attestation::Pending { uri } => Some((msg.to_vec(), uri.clone())),
                _ => None,
            })
            .collect()
    }

    /// `(merkle root, height)` for every Bitcoin attestation.
    pub fn bitcoin_attestations(&self) -> Vec<(Vec<u8>, u64)> {
        self.all_attestations()
            .into_iter()
            .filter_map(|(msg, att)| match att {
                Attestation::Bitcoin { height } => Some((msg.to_vec(), *height)),
                _ => None,
            })
            .collect()
    }

    /// Whether some branch ends in a Bitcoin attestation.
    pub fn is_complete(&self) -> bool {
        self.attestations.iter().any(Attestation::is_bitcoin)
            || self.ops.values().any(TimestampTree::is_complete)
    }

    /// First node (depth first) whose message equals `msg`.
    pub fn node_mut(&mut self, msg: &[u8]) -> Option<&mut TimestampTree> {
        if self.msg == msg {
            return Some(self);
        }
        self.ops.values_mut().find_map(|child| child.node_mut(msg))
    }

    /// Parse a tree rooted at `msg`.
    pub(crate) fn deserialize(reader: &mut Reader<'_>, msg: Vec<u8>) -> Result<Self, ProofError> {
        Self::deserialize_at(reader, msg, MAX_RECURSION_DEPTH)
    }

    fn deserialize_at(
        reader: &mut Reader<'_>,
        msg: Vec<u8>,
        depth: usize,
    ) -> Result<Self, ProofError> {
        if depth == 0 {
            return Err(ProofError::Codec("recursion limit reached".into()));
        }
        let mut node = Self::new(msg);
        let mut tag = reader.read_byte()?;
        while tag == TAG_FORK {
            let branch = reader.read_byte()?;
            node.read_branch(reader, branch, depth)?;
            tag = reader.read_byte()?;
        }
        node.read_branch(reader, tag, depth)?;
        Ok(node)
    }

    fn read_branch(&mut self, reader: &mut Reader<'_>, tag: u8, depth: usize) -> Result<(), ProofError> {
        if tag == TAG_ATTESTATION {
            self.attestations.insert(Attestation::deserialize(reader)?);
        } else {
            let op = Op::deserialize_from_tag(reader, tag)?;
            let child_msg = op.apply(&self.msg)?;
            let child = Self::deserialize_at(reader, child_msg, depth - 1)?;
            self.ops.insert(op, child);
        }
        Ok(())
    }

    /// Serialize in canonical order: attestations first, then ops, every
    /// branch but the last behind a fork marker.
    pub(crate) fn serialize(&self, out: &mut Vec<u8>) -> Result<(), ProofError> {
        if self.is_empty() {
            return Err(ProofError::Codec("cannot serialize an empty timestamp node".into()));
        }
        let atts: Vec<&Attestation> = self.attestations.iter().collect();
        let (last_att, leading_atts) = match atts.split_last() {
            Some((last, rest)) => (Some(*last), rest),
            None => (None, &[][..]),
        };
        for att in leading_atts {
            out.extend_from_slice(&[TAG_FORK, TAG_ATTESTATION]);
            att.serialize(out);
        }

        let ops: Vec<(&Op, &TimestampTree)> = self.ops.iter().collect();
        let Some(((last_op, last_child), leading_ops)) = ops.split_last() else {
            if let Some(att) = last_att {
                out.push(TAG_ATTESTATION);
                att.serialize(out);
            }
            return Ok(());
        };

        if let Some(att) = last_att {
            out.extend_from_slice(&[TAG_FORK, TAG_ATTESTATION]);
            att.serialize(out);
        }
        for (op, child) in leading_ops {
            out.push(TAG_FORK);
            op.serialize(out);
            child.serialize(out)?;
        }
        last_op.serialize(out);
        last_child.serialize(out)
    }

    /// Human-readable, indented dump of the tree.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        for att in &self.attestations {
            let _ = writeln!(out, "{pad}verify {att}");
            if att.is_bitcoin() {
                let mut root = self.msg.clone();
                root.reverse();
                let _ = writeln!(out, "{pad}# Bitcoin block merkle root {}", hex::encode(root));
            }
        }
        if self.ops.len() > 1 {
            for (op, child) in &self.ops {
                let _ = writeln!(out, "{pad} -> {op}");
                child.describe_into(out, indent + 4);
            }
        } else if let Some((op, child)) = self.ops.iter().next() {
            let _ = writeln!(out, "{pad}{op}");
            child.describe_into(out, indent);
        }
    }
}
