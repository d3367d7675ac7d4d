//! # Historical Inclusion Bundles
//!
//! Portable proofs that a transfer belongs to a head, either in the live
//! window (checked against `transfersWindowRoot`) or in a sealed segment
//! (checked against the segment root, then through the segments tree to
//! `segmentsMerkleRoot`).

use serde::{Deserialize, Serialize};
use sigil_core::HashHex;
use sigil_crypto::{merkle, verify_proof, TransferProof};

use crate::error::LedgerError;
use crate::head;
use crate::model::{HeadState, SegmentFile};
use crate::protocol::hash_transfer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadWindowProofBundle {
    pub window_merkle_root: HashHex,
    pub transfer_proof: TransferProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentProofBundle {
    pub segment_index: u64,
    pub segment_root: HashHex,
    pub transfer_proof: TransferProof,
    pub segments_siblings: Vec<HashHex>,
    pub head_hash_at_seal: HashHex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProofBundle {
    Head(HeadWindowProofBundle),
    Segment(SegmentProofBundle),
}

/// Inclusion proof for live-window transfer `index`.
pub fn build_head_window_bundle(
    head: &HeadState,
    index: usize,
) -> Result<HeadWindowProofBundle, LedgerError> {
    let leaves = head
        .transfers
        .iter()
        .map(hash_transfer)
        .collect::<Result<Vec<_>, _>>()?;
    let transfer_proof = merkle::proof(&leaves, index)?;
    Ok(HeadWindowProofBundle {
        window_merkle_root: merkle::build_root(&leaves),
        transfer_proof,
    })
}

/// Inclusion proof for transfer `index_in_segment` of an archived segment.
pub fn build_segment_bundle(
    head: &HeadState,
    file: &SegmentFile,
    index_in_segment: usize,
) -> Result<SegmentProofBundle, LedgerError> {
    let position = head
        .segments
        .iter()
        .position(|s| s.index == file.segment_index)
        .ok_or_else(|| {
            LedgerError::Structural(format!(
                "segment {} is not recorded in the head",
                file.segment_index
            ))
        })?;

    let leaves = file
        .transfers
        .iter()
        .map(hash_transfer)
        .collect::<Result<Vec<_>, _>>()?;
    let transfer_proof = merkle::proof(&leaves, index_in_segment)?;

    let roots: Vec<HashHex> = head.segments.iter().map(|s| s.root.clone()).collect();
    let segments_proof = merkle::proof(&roots, position)?;

    Ok(SegmentProofBundle {
        segment_index: file.segment_index,
        segment_root: merkle::build_root(&leaves),
        transfer_proof,
        segments_siblings: segments_proof.siblings,
        head_hash_at_seal: file.head_hash_at_seal.clone(),
    })
}

/// Check a bundle against `head`. Any mismatch is `false`.
pub fn verify_historical(head: &HeadState, bundle: &ProofBundle) -> bool {
    match bundle {
        ProofBundle::Head(b) => {
            head.transfers_window_root.as_ref() == Some(&b.window_merkle_root)
                && verify_proof(&b.window_merkle_root, &b.transfer_proof)
        }
        ProofBundle::Segment(b) => {
            let Some(segments_root) = head.segments_merkle_root.as_ref() else {
                return false;
            };
            let Some(position) = head.segments.iter().position(|s| s.index == b.segment_index)
            else {
                return false;
            };
            if head.segments[position].root != b.segment_root {
                return false;
            }
            let through_segments = TransferProof {
                leaf: b.segment_root.clone(),
                index: position,
                siblings: b.segments_siblings.clone(),
            };
            verify_proof(segments_root, &through_segments)
                && verify_proof(&b.segment_root, &b.transfer_proof)
        }
    }
}

/// Whether `file` is the archive the head recorded: same cid and root.
pub fn segment_file_matches(head: &HeadState, file: &SegmentFile) -> bool {
    let Some(entry) = head.segments.iter().find(|s| s.index == file.segment_index) else {
        return false;
    };
    let leaves = file.transfers.iter().map(hash_transfer).collect::<Result<Vec<_>, _>>();
    match (file.cid(), leaves) {
        (Ok(cid), Ok(leaves)) => {
            cid == entry.cid
                && entry.root == file.segment_root
                && merkle::build_root(&leaves) == file.segment_root
                && entry.count == file.transfers.len() as u64
        }
        _ => false,
    }
}

/// The window root the head should carry for its current live window.
pub fn current_window_root(head: &HeadState) -> Result<HashHex, LedgerError> {
    head::window_root(&head.transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TransferRecord;
    use crate::segment::{seal_window, SealOutcome};

    fn closed(n: u64) -> TransferRecord {
        TransferRecord {
            sender_signature: format!("s{n}"),
            sender_stamp: format!("t{n}"),
            sender_kai_pulse: n,
            payload: None,
            receiver_signature: Some(format!("r{n}")),
            receiver_stamp: Some(format!("rs{n}")),
            receiver_kai_pulse: Some(n + 1),
        }
    }

    fn head_with(n: u64) -> HeadState {
        let mut h = HeadState::new(1, 0, 0, "Root", "k");
        h.transfers = (0..n).map(closed).collect();
        h.cumulative_transfers = n;
        h.transfers_window_root = Some(head::window_root(&h.transfers).unwrap());
        h
    }

    fn seal(h: &HeadState) -> (HeadState, SegmentFile) {
        match seal_window(h).unwrap() {
            SealOutcome::Sealed {
                head, segment_file, ..
            } => (*head, segment_file),
            SealOutcome::Unchanged => panic!("expected a seal"),
        }
    }

    #[test]
    fn head_window_bundle_verifies() {
        let h = head_with(5);
        for i in 0..5 {
            let b = ProofBundle::Head(build_head_window_bundle(&h, i).unwrap());
            assert!(verify_historical(&h, &b));
        }
    }

    #[test]
    fn head_window_bundle_rejects_stale_root() {
        let h = head_with(3);
        let b = ProofBundle::Head(build_head_window_bundle(&h, 1).unwrap());
        let mut moved = h.clone();
        moved.transfers.push(closed(9));
        moved.transfers_window_root = Some(current_window_root(&moved).unwrap());
        assert!(!verify_historical(&moved, &b));
    }

    #[test]
    fn segment_bundle_verifies_across_segments() {
        let (mut h, first) = seal(&head_with(3));
        h.transfers = (10..14).map(closed).collect();
        let (h, second) = seal(&h);
        assert_eq!(h.segments.len(), 2);

        for (file, n) in [(&first, 3), (&second, 4)] {
            assert!(segment_file_matches(&h, file));
            for i in 0..n {
                let b = ProofBundle::Segment(build_segment_bundle(&h, file, i).unwrap());
                assert!(verify_historical(&h, &b), "segment {} #{i}", file.segment_index);
            }
        }
    }

    #[test]
    fn segment_bundle_rejects_tampered_sibling() {
        let (mut h, _) = seal(&head_with(2));
        h.transfers = (10..12).map(closed).collect();
        let (h, second) = seal(&h);
        let mut b = build_segment_bundle(&h, &second, 0).unwrap();
        b.segments_siblings[0] = sigil_core::hash_str("forged");
        assert!(!verify_historical(&h, &ProofBundle::Segment(b)));
    }

    #[test]
    fn tampered_segment_file_detected() {
        let (h, mut file) = seal(&head_with(2));
        file.transfers[0].sender_kai_pulse = 99;
        assert!(!segment_file_matches(&h, &file));
    }

    #[test]
    fn unknown_segment_is_structural() {
        let (h, mut file) = seal(&head_with(2));
        file.segment_index = 7;
        assert!(matches!(
            build_segment_bundle(&h, &file, 0),
            Err(LedgerError::Structural(_))
        ));
    }

    #[test]
    fn bundle_kind_tag() {
        let h = head_with(2);
        let b = ProofBundle::Head(build_head_window_bundle(&h, 0).unwrap());
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["kind"], "head");
        assert!(v.get("windowMerkleRoot").is_some());
        let back: ProofBundle = serde_json::from_value(v).unwrap();
        assert_eq!(back, b);
    }
}
