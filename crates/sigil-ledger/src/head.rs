//! # Head Chain
//!
//! A deterministic hash over the head's identity and sealed history. Every
//! hardened transfer is pinned to the value this module computes for the
//! head as it stood immediately before that transfer, so rewriting history
//! or replaying a record against a different head breaks the chain.
//!
//! The snapshot deliberately excludes the live window: a transfer's pin
//! only moves when the cumulative count does.

use serde::Serialize;
use sigil_core::{hash_canonical, CanonicalizationError, HashHex};
use sigil_crypto::build_root;

use crate::error::LedgerError;
use crate::model::{HeadState, SegmentEntry, TransferRecord};
use crate::protocol::hash_transfer;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeadSnapshot<'a> {
    pulse: u64,
    beat: u64,
    step_index: u64,
    chakra_day: &'a str,
    kai_signature: &'a str,
    owner_key: &'a str,
    cumulative_transfers: u64,
    segments: &'a [SegmentEntry],
    segments_merkle_root: &'a str,
}

/// Canonical head hash. `cumulative_override` replaces the stored
/// `cumulativeTransfers` in the snapshot.
pub fn compute(
    state: &HeadState,
    cumulative_override: Option<u64>,
) -> Result<HashHex, CanonicalizationError> {
    let snapshot = HeadSnapshot {
        pulse: state.pulse,
        beat: state.beat,
        step_index: state.step_index,
        chakra_day: &state.chakra_day,
        kai_signature: &state.kai_signature,
        owner_key: state.owner_key(),
        cumulative_transfers: cumulative_override.unwrap_or(state.cumulative_transfers),
        segments: &state.segments,
        segments_merkle_root: state
            .segments_merkle_root
            .as_ref()
            .map_or("", HashHex::as_str),
    };
    hash_canonical(&snapshot)
}

/// Number of transfers archived in sealed segments.
pub fn sum_segments(state: &HeadState) -> u64 {
    state.segments.iter().map(|s| s.count).sum()
}

/// The pin a hardened transfer at `index_within_window` must carry.
pub fn expected_prev_head_root(
    state: &HeadState,
    index_within_window: usize,
) -> Result<HashHex, CanonicalizationError> {
    compute(state, Some(sum_segments(state) + index_within_window as u64))
}

/// Merkle root over the full leaf hashes of the live window.
pub fn window_root(transfers: &[TransferRecord]) -> Result<HashHex, LedgerError> {
    let leaves = transfers
        .iter()
        .map(hash_transfer)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(build_root(&leaves))
}

/// Merkle root over segment roots in the order given.
pub fn segments_root(segments: &[SegmentEntry]) -> HashHex {
    let roots: Vec<HashHex> = segments.iter().map(|s| s.root.clone()).collect();
    build_root(&roots)
}
