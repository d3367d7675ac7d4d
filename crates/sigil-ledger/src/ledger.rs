//! # Ledger
//!
//! Single-writer facade over one head document. Every state change goes
//! through `&mut self`, so a `Ledger` needs no internal locking; callers
//! sharing a head across tasks wrap it themselves.
//!
//! ## Transfer lifecycle
//!
//! 1. [`Ledger::send`] appends an open transfer and its hardened record,
//!    pinned to the head as it stood before the append and signed by the
//!    sender.
//! 2. [`Ledger::receive`] closes it, records the receiver stamp and signs
//!    the receive message linked to the sender signature.
//! 3. [`Ledger::seal`] (or the automatic seal at `segmentSize`) archives
//!    closed transfers into a segment.

use serde_json::json;
use sigil_core::{base64_encode, HashHex, PhiAmount};
use sigil_crypto::Keypair;
use sigil_zkp::{
    ProofError, ProofProvider, ProvidedProof, ReceiveProofInput, SendProofInput, ZkBundle, ZkStamp,
};

use crate::error::LedgerError;
use crate::head;
use crate::model::{HardenedTransfer, HeadState, Payload, SegmentFile, TransferRecord};
use crate::protocol::{
    build_receive_message, build_send_message, generate_nonce, hash_transfer,
    hash_transfer_sender_side, receiver_stamp, ReceiveMessage, SendMessage, SigilIdentity,
};
use crate::segment::{seal_window, SealOutcome, EXHALE_MIME_PREFIX};

/// Sender-side inputs to [`Ledger::send`].
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub sender_signature: String,
    pub sender_stamp: String,
    pub pulse: u64,
    pub payload: Option<Payload>,
}

/// Receiver-side inputs to [`Ledger::receive`].
#[derive(Debug, Clone)]
pub struct ReceiveRequest {
    pub receiver_signature: String,
    pub pulse: u64,
}

/// A segment produced by a seal.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedSegment {
    pub segment_file: SegmentFile,
    pub cid: HashHex,
}

#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// Position of the new transfer in the live window.
    pub window_index: usize,
    pub hardened: HardenedTransfer,
    /// Segment sealed automatically before the append, if the window was full.
    pub sealed: Option<SealedSegment>,
}

#[derive(Debug, Clone)]
pub struct ReceiveOutcome {
    pub window_index: usize,
    /// `None` for a legacy window transfer with no hardened record.
    pub hardened: Option<HardenedTransfer>,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    head: HeadState,
}

impl Ledger {
    pub fn new(head: HeadState) -> Self {
        Self { head }
    }

    pub fn head(&self) -> &HeadState {
        &self.head
    }

    pub fn into_head(self) -> HeadState {
        self.head
    }

    /// Append and sign a new open transfer.
    pub fn send(
        &mut self,
        sender: &Keypair,
        req: SendRequest,
        prover: Option<&dyn ProofProvider>,
    ) -> Result<SendOutcome, LedgerError> {
        if let Some(last) = self.head.transfers.last() {
            if !last.is_closed() {
                return Err(LedgerError::OpenTransferPending {
                    index: self.head.transfers.len() - 1,
                });
            }
        }
        if self.head.hardened_transfers.len() != self.head.transfers.len() {
            return Err(LedgerError::Misaligned {
                window: self.head.transfers.len(),
                hardened: self.head.hardened_transfers.len(),
            });
        }

        let cap = self.head.segment_size_or_default();
        let sealed = if self.head.transfers.len() as u64 >= cap {
            tracing::info!(cap, "window full; sealing before send");
            self.seal()?
        } else {
            None
        };

        let transfer = TransferRecord {
            sender_signature: req.sender_signature,
            sender_stamp: req.sender_stamp,
            sender_kai_pulse: req.pulse,
            payload: req.payload,
            receiver_signature: None,
            receiver_stamp: None,
            receiver_kai_pulse: None,
        };
        let window_index = self.head.transfers.len();
        let previous_head_root = head::expected_prev_head_root(&self.head, window_index)?;
        let leaf = hash_transfer_sender_side(&transfer)?;
        let nonce = generate_nonce();

        let identity = SigilIdentity::from_head(&self.head);
        let message = build_send_message(&SendMessage {
            identity: &identity,
            previous_head_root: previous_head_root.as_str(),
            sender_pulse: req.pulse,
            sender_pub_key: sender.public_key_b64u(),
            nonce: &nonce,
            transfer_leaf_hash_send: leaf.as_str(),
        })?;
        let sender_sig = sender.sign(message.as_bytes());

        let mut hardened = HardenedTransfer {
            previous_head_root: previous_head_root.to_string(),
            sender_pub_key: sender.public_key_b64u().to_string(),
            sender_sig,
            sender_kai_pulse: Some(req.pulse),
            nonce: nonce.clone(),
            transfer_leaf_hash_send: leaf.to_string(),
            ..HardenedTransfer::default()
        };

        if let Some(prover) = prover {
            let input = SendProofInput {
                leaf_hash: leaf.to_string(),
                previous_head_root: previous_head_root.to_string(),
                nonce: nonce.clone(),
                sender_pulse: req.pulse,
            };
            let provided = prover.provide_send_proof(&input);
            if let Some((bundle, stamp)) =
                attach_proof("send", provided, self.head.zk_verifying_key.as_ref())
            {
                hardened.zk_send_bundle = Some(bundle);
                hardened.zk_send = Some(stamp);
            }
        }

        self.head.transfers.push(transfer);
        self.head.hardened_transfers.push(hardened.clone());
        self.head.cumulative_transfers =
            head::sum_segments(&self.head) + self.head.transfers.len() as u64;
        self.head.transfer_nonce = Some(nonce);
        self.head.segment_size.get_or_insert(cap);
        if self.head.creator_public_key.is_none() {
            self.head.creator_public_key = Some(sender.public_key_b64u().to_string());
        }
        self.head.transfers_window_root = Some(head::window_root(&self.head.transfers)?);

        tracing::debug!(
            index = window_index,
            pin = %previous_head_root,
            zk = hardened.zk_send.is_some(),
            "signed send"
        );
        Ok(SendOutcome {
            window_index,
            hardened,
            sealed,
        })
    }

    /// Close the last open transfer and sign the receive side.
    pub fn receive(
        &mut self,
        receiver: &Keypair,
        req: ReceiveRequest,
        prover: Option<&dyn ProofProvider>,
    ) -> Result<ReceiveOutcome, LedgerError> {
        let window_index = match self.head.transfers.last() {
            Some(last) if !last.is_closed() => self.head.transfers.len() - 1,
            _ => return Err(LedgerError::NoOpenTransfer),
        };

        let last = &mut self.head.transfers[window_index];
        let stamp = receiver_stamp(&req.receiver_signature, &last.sender_stamp, req.pulse);
        last.receiver_signature = Some(req.receiver_signature);
        last.receiver_stamp = Some(stamp.to_string());
        last.receiver_kai_pulse = Some(req.pulse);
        let leaf = hash_transfer(last)?;

        let fallback_vkey = self.head.zk_verifying_key.as_ref();
        let hardened = match self.head.hardened_transfers.get_mut(window_index) {
            Some(h) if h.receiver_sig.is_none() => {
                let message = build_receive_message(&ReceiveMessage {
                    previous_head_root: &h.previous_head_root,
                    sender_sig: &h.sender_sig,
                    receiver_pulse: req.pulse,
                    receiver_pub_key: receiver.public_key_b64u(),
                    transfer_leaf_hash_receive: leaf.as_str(),
                })?;
                h.receiver_sig = Some(receiver.sign(message.as_bytes()));
                h.receiver_pub_key = Some(receiver.public_key_b64u().to_string());
                h.receiver_kai_pulse = Some(req.pulse);
                h.transfer_leaf_hash_receive = Some(leaf.to_string());

                if let Some(prover) = prover {
                    let input = ReceiveProofInput {
                        leaf_hash: leaf.to_string(),
                        previous_head_root: h.previous_head_root.clone(),
                        link_sig: h.sender_sig.clone(),
                    };
                    let provided = prover.provide_receive_proof(&input);
                    if let Some((bundle, stamp)) = attach_proof("receive", provided, fallback_vkey)
                    {
                        h.zk_receive_bundle = Some(bundle);
                        h.zk_receive = Some(stamp);
                    }
                }
                Some(h.clone())
            }
            _ => {
                tracing::debug!(index = window_index, "no open hardened record to close");
                None
            }
        };

        self.head.transfers_window_root = Some(head::window_root(&self.head.transfers)?);
        tracing::debug!(index = window_index, "signed receive");
        Ok(ReceiveOutcome {
            window_index,
            hardened,
        })
    }

    /// Seal the closed prefix of the live window. `None` when nothing was
    /// eligible.
    ///
    /// A trailing open transfer stays live; its hardened pin was computed
    /// before this seal and will no longer match the head.
    pub fn seal(&mut self) -> Result<Option<SealedSegment>, LedgerError> {
        match seal_window(&self.head)? {
            SealOutcome::Unchanged => Ok(None),
            SealOutcome::Sealed {
                head,
                segment_file,
                cid,
            } => {
                self.head = *head;
                Ok(Some(SealedSegment { segment_file, cid }))
            }
        }
    }
}

/// Wrap a provider's answer as a bundle and stamp. Provider failures are
/// logged and the transfer proceeds without a proof.
fn attach_proof(
    side: &str,
    provided: Result<Option<ProvidedProof>, ProofError>,
    fallback_vkey: Option<&serde_json::Value>,
) -> Option<(ZkBundle, ZkStamp)> {
    let provided = match provided {
        Ok(Some(p)) => p,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(side, error = %e, "proof provider failed; continuing without proof");
            return None;
        }
    };
    let bundle = ZkBundle::groth16(provided);
    match ZkStamp::for_bundle(&bundle, fallback_vkey) {
        Ok(stamp) => Some((bundle, stamp)),
        Err(e) => {
            tracing::warn!(side, error = %e, "proof bundle could not be stamped");
            None
        }
    }
}

/// Payload recording value moved out of this branch.
pub fn exhale_payload(
    amount: &PhiAmount,
    pulse: u64,
    kai_signature: &str,
    user_key: &str,
) -> Payload {
    let amount_phi = amount.to_string();
    let body = json!({
        "kind": "exhale",
        "unit": "Φ",
        "amountPhi": amount_phi,
        "atPulse": pulse,
        "kaiSignature": kai_signature,
        "userPhiKey": user_key,
    })
    .to_string();
    let encoded = base64_encode(body.as_bytes());
    Payload {
        name: format!("exhale_{}phi.json", amount_phi.replace('.', "_")),
        mime: format!("{EXHALE_MIME_PREFIX}+json"),
        size: encoded.len() as u64,
        encoded,
    }
}
