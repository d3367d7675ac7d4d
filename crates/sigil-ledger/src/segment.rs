//! # Segment Sealer
//!
//! Moves the closed prefix of the live window into an immutable
//! [`SegmentFile`], records its summary in the head, and updates the branch
//! accounting (`branchBasePhi` / `branchSpentPhi`).
//!
//! A trailing open transfer is never sealed; it becomes the whole of the new
//! live window. Sealing a window with nothing eligible leaves the head
//! untouched.

use serde_json::Value;
use sigil_core::{base64_decode, HashHex, PhiAmount};
use sigil_crypto::build_root;

use crate::error::LedgerError;
use crate::head;
use crate::model::{HeadState, SegmentEntry, SegmentFile, TransferRecord};
use crate::protocol::hash_transfer;

/// MIME prefix of payloads that move value out of a branch.
pub const EXHALE_MIME_PREFIX: &str = "application/vnd.kairos-exhale";

/// Result of [`seal_window`].
#[derive(Debug, Clone, PartialEq)]
pub enum SealOutcome {
    /// Nothing was eligible; the head is unchanged.
    Unchanged,
    Sealed {
        head: Box<HeadState>,
        segment_file: SegmentFile,
        cid: HashHex,
    },
}

/// Value moved by `t`: the `amountPhi` of an exhale payload, else zero.
/// Malformed payloads move nothing.
pub fn exhale_amount(t: &TransferRecord) -> PhiAmount {
    let Some(payload) = t.payload.as_ref() else {
        return PhiAmount::zero();
    };
    if !payload.mime.starts_with(EXHALE_MIME_PREFIX) {
        return PhiAmount::zero();
    }
    let body = base64_decode(&payload.encoded)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    match body {
        Some(v) if v.get("kind").and_then(Value::as_str) == Some("exhale") => {
            match v.get("amountPhi").and_then(Value::as_str) {
                Some(amount) => PhiAmount::parse_lossy(amount),
                None => PhiAmount::zero(),
            }
        }
        _ => PhiAmount::zero(),
    }
}

/// Seal the eligible prefix of `state`'s live window.
pub fn seal_window(state: &HeadState) -> Result<SealOutcome, LedgerError> {
    let live = &state.transfers;
    let open_last = live.last().is_some_and(|t| !t.is_closed());
    let cut = if open_last { live.len() - 1 } else { live.len() };
    if cut == 0 {
        tracing::debug!(window = live.len(), "nothing eligible to seal");
        return Ok(SealOutcome::Unchanged);
    }
    let sealed = &live[..cut];

    // Branch accounting: value moved after the last closed transfer is
    // newly spent in this window.
    let pivot = sealed.iter().rposition(TransferRecord::is_closed);
    let after_pivot = pivot.map_or(0, |p| p + 1);
    let spent_in_window: PhiAmount = sealed[after_pivot..].iter().map(exhale_amount).sum();

    let stored_base = state.branch_base_phi.as_deref().map(PhiAmount::parse_lossy);
    let base_established = stored_base.as_ref().is_some_and(|b| !b.is_zero());
    let base = if base_established {
        stored_base.unwrap_or_default()
    } else {
        match pivot {
            Some(p) => exhale_amount(&sealed[p]),
            None => state
                .valuation_phi()
                .map(|v| PhiAmount::parse_lossy(&v))
                .unwrap_or_default(),
        }
    };
    let prior_spent = PhiAmount::parse_lossy(state.branch_spent_phi.as_deref().unwrap_or(""));
    let spent = prior_spent + spent_in_window;

    let leaves = sealed
        .iter()
        .map(hash_transfer)
        .collect::<Result<Vec<_>, _>>()?;
    let segment_root = build_root(&leaves);
    let head_hash_at_seal = head::compute(state, None)?;

    let segment_index = state.segments.len() as u64;
    let start = head::sum_segments(state);
    let count = cut as u64;

    let archived_len = cut.min(state.hardened_transfers.len());
    let segment_file = SegmentFile {
        version: SegmentFile::VERSION,
        segment_index,
        segment_range: [start, start + count - 1],
        segment_root: segment_root.clone(),
        head_hash_at_seal: head_hash_at_seal.clone(),
        leaf_hash: SegmentFile::LEAF_HASH.to_string(),
        transfers: sealed.to_vec(),
        hardened_transfers: state.hardened_transfers[..archived_len].to_vec(),
    };
    let cid = segment_file.cid()?;

    let mut next = state.clone();
    next.segments.push(SegmentEntry {
        index: segment_index,
        root: segment_root,
        cid: cid.clone(),
        count,
    });
    next.segments_merkle_root = Some(head::segments_root(&next.segments));
    next.transfers = live[cut..].to_vec();
    next.hardened_transfers = state.hardened_transfers[archived_len..].to_vec();
    next.cumulative_transfers = head::sum_segments(&next) + next.transfers.len() as u64;
    next.transfers_window_root = None;
    next.head_hash_at_seal = Some(head_hash_at_seal);
    next.segment_size = Some(state.segment_size_or_default());
    if !base_established && base.is_positive() {
        next.branch_base_phi = Some(base.to_string());
    }
    next.branch_spent_phi = Some(spent.to_fixed_string());

    tracing::debug!(
        segment = segment_index,
        count,
        cid = %cid,
        remaining = next.transfers.len(),
        "sealed window"
    );

    Ok(SealOutcome::Sealed {
        head: Box::new(next),
        segment_file,
        cid,
    })
}
