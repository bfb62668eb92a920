//! Quinary Merkle Tree Module
//!
//! A fixed-arity-5 Merkle tree over `Fq`, hashed with `poseidon_t5`. Used
//! for the state tree, the active-state tree and the deactivate tree — all
//! three differ only in what gets hashed into a leaf, not in the tree
//! mechanics here.

use crate::error::{AmaciError, Result};
use crate::field;
use crate::poseidon::poseidon_t5;
use ark_ed_on_bn254::Fq;
use ark_ff::Zero;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tree branching factor, fixed by the protocol.
pub const ARITY: usize = 5;

/// A sibling path from a leaf to the root: one 4-element sibling group
/// plus a position index per level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerklePath {
    /// `path_elements[k]` holds the 4 siblings of the node on the path at
    /// level `k` (in ascending position order, the updated node's slot
    /// omitted).
    pub path_elements: Vec<[Fq; 4]>,
    /// `indices[k] = (leaf_index / 5^k) % 5`: the updated node's position
    /// among its 5 siblings at level `k`.
    pub indices: Vec<usize>,
}

/// A quinary Merkle tree of fixed `depth`, with `5^depth` leaf slots.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    depth: u32,
    /// `zero[k]` is the root of an empty subtree of depth `k`.
    zero: Vec<Fq>,
    /// `levels[k]` holds all *non-zero* node values at level `k`, indexed
    /// by position; level 0 is the leaves, level `depth` is the root.
    levels: Vec<Vec<Fq>>,
}

impl MerkleTree {
    /// Builds an empty tree of the given depth, precomputing the
    /// zero-hash chain `zero[0] = 0, zero[k] = poseidon5([zero[k-1]; 5])`.
    pub fn new(depth: u32) -> Result<Self> {
        let mut zero = Vec::with_capacity(depth as usize + 1);
        zero.push(Fq::zero());
        for k in 1..=depth as usize {
            let prev = zero[k - 1];
            zero.push(poseidon_t5(&[prev, prev, prev, prev, prev])?);
        }

        let levels = vec![Vec::new(); depth as usize + 1];
        Ok(Self { depth, zero, levels })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of leaf slots, `5^depth`.
    pub fn capacity(&self) -> u64 {
        ARITY.pow(self.depth) as u64
    }

    /// Current root (zero-hash of the full depth if no leaves are set).
    pub fn root(&self) -> Fq {
        self.node(self.depth as usize, 0)
    }

    fn node(&self, level: usize, index: usize) -> Fq {
        self.levels[level]
            .get(index)
            .copied()
            .unwrap_or(self.zero[level])
    }

    /// Sets leaf `index` to `value` and recomputes every ancestor up to
    /// the root.
    pub fn update_leaf(&mut self, index: u64, value: Fq) -> Result<()> {
        if index >= self.capacity() {
            return Err(AmaciError::StateIdxOutOfRange(index, self.depth));
        }
        let mut idx = index as usize;
        self.set_node(0, idx, value);

        for level in 0..self.depth as usize {
            let base = idx - (idx % ARITY);
            let siblings = [
                self.node(level, base),
                self.node(level, base + 1),
                self.node(level, base + 2),
                self.node(level, base + 3),
                self.node(level, base + 4),
            ];
            let parent = poseidon_t5(&siblings)?;
            idx /= ARITY;
            self.set_node(level + 1, idx, parent);
        }
        Ok(())
    }

    fn set_node(&mut self, level: usize, index: usize, value: Fq) {
        if self.levels[level].len() <= index {
            self.levels[level].resize(index + 1, self.zero[level]);
        }
        self.levels[level][index] = value;
    }

    /// Batch-rebuilds the tree from a dense leaf vector. Equivalent to
    /// (but far cheaper than) calling [`Self::update_leaf`] for each
    /// index in turn.
    pub fn init_leaves(depth: u32, values: &[Fq]) -> Result<Self> {
        let mut tree = Self::new(depth)?;
        if values.len() as u64 > tree.capacity() {
            return Err(AmaciError::StateIdxOutOfRange(
                values.len() as u64,
                depth,
            ));
        }
        tree.levels[0] = values.to_vec();

        for level in 0..depth as usize {
            let width = tree.levels[level].len().div_ceil(ARITY);
            let mut next = Vec::with_capacity(width);
            for group in 0..width {
                let base = group * ARITY;
                let siblings = [
                    tree.node(level, base),
                    tree.node(level, base + 1),
                    tree.node(level, base + 2),
                    tree.node(level, base + 3),
                    tree.node(level, base + 4),
                ];
                next.push(poseidon_t5(&siblings)?);
            }
            tree.levels[level + 1] = next;
        }
        Ok(tree)
    }

    /// Returns the sibling path and position indices for leaf `index`.
    pub fn path_of(&self, index: u64) -> Result<MerklePath> {
        if index >= self.capacity() {
            return Err(AmaciError::StateIdxOutOfRange(index, self.depth));
        }
        let mut idx = index as usize;
        let mut path_elements = Vec::with_capacity(self.depth as usize);
        let mut indices = Vec::with_capacity(self.depth as usize);

        for level in 0..self.depth as usize {
            let position = idx % ARITY;
            let base = idx - position;
            let group = [
                self.node(level, base),
                self.node(level, base + 1),
                self.node(level, base + 2),
                self.node(level, base + 3),
                self.node(level, base + 4),
            ];
            let siblings: Vec<Fq> = group
                .iter()
                .enumerate()
                .filter(|(slot, _)| *slot != position)
                .map(|(_, v)| *v)
                .collect();
            path_elements.push(
                siblings
                    .try_into()
                    .expect("5-wide group minus the node's own slot leaves exactly 4 siblings"),
            );
            indices.push(position);
            idx /= ARITY;
        }
        Ok(MerklePath { path_elements, indices })
    }

    /// Extends a `from_depth`-deep tree's root to what the root of a
    /// `to_depth`-deep tree would be if its first `5^from_depth` leaves
    /// matched `small_root`'s tree and every remaining leaf were zero.
    ///
    /// This is the only sparse shortcut the tree mechanics allow: for
    /// each level from `from_depth` to `to_depth - 1`, hash `[current,
    /// zero[k], zero[k], zero[k], zero[k]]`.
    pub fn extend_root(small_root: Fq, from_depth: u32, to_depth: u32) -> Result<Fq> {
        if to_depth < from_depth {
            return Err(AmaciError::StateIdxOutOfRange(from_depth as u64, to_depth));
        }
        let mut zero = Fq::zero();
        let mut zeros = vec![zero];
        for _ in 1..=to_depth as usize {
            zero = poseidon_t5(&[zero, zero, zero, zero, zero])?;
            zeros.push(zero);
        }

        let mut current = small_root;
        for k in from_depth as usize..to_depth as usize {
            let z = zeros[k];
            current = poseidon_t5(&[current, z, z, z, z])?;
        }
        Ok(current)
    }

    /// Captures the dense leaf vector so an embedder can persist and
    /// later restore a tree between batches without replaying every
    /// `update_leaf` call.
    #[cfg(feature = "serde")]
    pub fn snapshot(&self) -> LeafSnapshot {
        LeafSnapshot {
            depth: self.depth,
            leaves: self.levels[0].iter().map(field::fq_to_biguint).map(|n| n.to_string()).collect(),
        }
    }

    /// Rebuilds a tree from a [`LeafSnapshot`] taken by [`Self::snapshot`].
    #[cfg(feature = "serde")]
    pub fn from_snapshot(snapshot: &LeafSnapshot) -> Result<Self> {
        let values: std::result::Result<Vec<Fq>, _> =
            snapshot.leaves.iter().map(|s| field::fq_from_decimal(s)).collect();
        Self::init_leaves(snapshot.depth, &values?)
    }
}

/// Serializable snapshot of a tree's leaf vector, decimal-string encoded so
/// it survives a round trip through non-Rust tooling.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafSnapshot {
    pub depth: u32,
    pub leaves: Vec<String>,
}
