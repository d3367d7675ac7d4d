//! # Merkle Engine — Sort-Before-Hash Binary Tree
//!
//! Commits an ordered list of leaf hashes to one root and produces inclusion
//! proofs against it. Used for the live transfer window, for each sealed
//! segment, and for the list of segment roots.
//!
//! ## Algorithm
//!
//! - No leaves: the root is `"0"×64`.
//! - One leaf: the root is that leaf.
//! - Otherwise pair adjacent nodes level by level. An odd level duplicates
//!   its last node. Each pair is sorted lexicographically before
//!   `hash_pair(a, b) = SHA256(a + "|" + b)`.
//!
//! Because every pair is sorted, a proof only needs the sibling hashes; the
//! left/right position is implied by the ordering.
//!
//! ## Concurrency
//!
//! Every function here is pure. Nothing is cached between calls.

use serde::{Deserialize, Serialize};
use sigil_core::{hash_pair, HashHex};

use crate::error::MerkleError;

/// Inclusion proof for one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProof {
    pub leaf: HashHex,
    pub index: usize,
    pub siblings: Vec<HashHex>,
}

// ---------------------------------------------------------------------------
// Core hashing
// ---------------------------------------------------------------------------

/// Hash two nodes in sorted order.
fn hash_sorted(a: &HashHex, b: &HashHex) -> HashHex {
    if a <= b {
        hash_pair(a, b)
    } else {
        hash_pair(b, a)
    }
}

/// Fold one level into the next, duplicating the last node of an odd level.
fn next_level(level: &[HashHex]) -> Vec<HashHex> {
    level
        .chunks(2)
        .map(|pair| {
            let left = &pair[0];
            let right = pair.get(1).unwrap_or(left);
            hash_sorted(left, right)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Root, proof, verification
// ---------------------------------------------------------------------------

/// Merkle root of `leaves`.
pub fn build_root(leaves: &[HashHex]) -> HashHex {
    let Some(first) = leaves.first() else {
        return HashHex::zero();
    };
    if leaves.len() == 1 {
        return first.clone();
    }
    let mut level = next_level(leaves);
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.swap_remove(0)
}

/// Inclusion proof for `leaves[index]`.
///
/// An empty leaf set yields the degenerate proof `{ leaf: "0"×64, index: 0,
/// siblings: [] }`, which verifies against the empty root.
///
/// # Errors
///
/// `MerkleError::IndexOutOfRange` when `index >= leaves.len()` on a
/// non-empty set.
pub fn proof(leaves: &[HashHex], index: usize) -> Result<TransferProof, MerkleError> {
    if leaves.is_empty() {
        return Ok(TransferProof {
            leaf: HashHex::zero(),
            index: 0,
            siblings: Vec::new(),
        });
    }
    if index >= leaves.len() {
        return Err(MerkleError::IndexOutOfRange {
            index,
            len: leaves.len(),
        });
    }

    let mut siblings = Vec::new();
    let mut idx = index;
    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let sib_idx = if idx % 2 == 1 { idx - 1 } else { idx + 1 };
        // At the odd edge the node is paired with itself.
        let sibling = level.get(sib_idx).unwrap_or(&level[idx]).clone();
        siblings.push(sibling);
        level = next_level(&level);
        idx /= 2;
    }

    Ok(TransferProof {
        leaf: leaves[index].clone(),
        index,
        siblings,
    })
}

/// Replay `proof` and compare the result with `root`.
pub fn verify_proof(root: &HashHex, proof: &TransferProof) -> bool {
    let mut acc = proof.leaf.clone();
    let mut idx = proof.index;
    for sib in &proof.siblings {
        acc = if idx % 2 == 0 {
            hash_sorted(&acc, sib)
        } else {
            hash_sorted(sib, &acc)
        };
        idx /= 2;
    }
    &acc == root
}
