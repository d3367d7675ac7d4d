//! # Send/Receive Protocol
//!
//! Builders for the exact bytes each party signs, and the transfer leaf
//! hashes those messages bind.
//!
//! ## Security Invariant
//!
//! Signed messages are always produced through [`CanonicalBytes`]; two
//! parties building the same message get byte-identical input regardless of
//! field order. Leaf hashes use the compact document-order serialization of
//! a fixed projection so they match leaves already recorded in segment
//! archives.

use serde::Serialize;
use sigil_core::{hash_str, sha256_hex, CanonicalBytes, CanonicalizationError, HashHex};

use crate::error::LedgerError;
use crate::identity::{normalize_chakra_day, ChakraDay};
use crate::model::{HeadState, TransferRecord};

/// Version tag carried by both message kinds.
pub const MESSAGE_VERSION: u8 = 1;

/// Sigil coordinates embedded in the send message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SigilIdentity {
    pub pulse: u64,
    pub beat: u64,
    pub step_index: u64,
    pub chakra_day: &'static str,
    pub kai_signature: String,
}

impl SigilIdentity {
    /// Identity of `head`, with its chakra day normalized (unknown → Root).
    pub fn from_head(head: &HeadState) -> Self {
        let chakra = normalize_chakra_day(&head.chakra_day).unwrap_or(ChakraDay::Root);
        Self {
            pulse: head.pulse,
            beat: head.beat,
            step_index: head.step_index,
            chakra_day: chakra.label(),
            kai_signature: head.kai_signature.clone(),
        }
    }
}

/// Fields the sender signs.
#[derive(Debug, Clone)]
pub struct SendMessage<'a> {
    pub identity: &'a SigilIdentity,
    pub previous_head_root: &'a str,
    pub sender_pulse: u64,
    pub sender_pub_key: &'a str,
    pub nonce: &'a str,
    pub transfer_leaf_hash_send: &'a str,
}

/// Fields the receiver signs. `sender_sig` links the two halves.
#[derive(Debug, Clone)]
pub struct ReceiveMessage<'a> {
    pub previous_head_root: &'a str,
    pub sender_sig: &'a str,
    pub receiver_pulse: u64,
    pub receiver_pub_key: &'a str,
    pub transfer_leaf_hash_receive: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendWire<'a> {
    v: u8,
    #[serde(rename = "type")]
    kind: &'static str,
    sigil: &'a SigilIdentity,
    previous_head_root: &'a str,
    sender_kai_pulse: u64,
    sender_pub_key: &'a str,
    nonce: &'a str,
    transfer_leaf_hash_send: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReceiveWire<'a> {
    v: u8,
    #[serde(rename = "type")]
    kind: &'static str,
    link: &'a str,
    previous_head_root: &'a str,
    receiver_kai_pulse: u64,
    receiver_pub_key: &'a str,
    transfer_leaf_hash_receive: &'a str,
}

pub fn build_send_message(msg: &SendMessage<'_>) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(&SendWire {
        v: MESSAGE_VERSION,
        kind: "send",
        sigil: msg.identity,
        previous_head_root: msg.previous_head_root,
        sender_kai_pulse: msg.sender_pulse,
        sender_pub_key: msg.sender_pub_key,
        nonce: msg.nonce,
        transfer_leaf_hash_send: msg.transfer_leaf_hash_send,
    })
}

pub fn build_receive_message(
    msg: &ReceiveMessage<'_>,
) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(&ReceiveWire {
        v: MESSAGE_VERSION,
        kind: "receive",
        link: msg.sender_sig,
        previous_head_root: msg.previous_head_root,
        receiver_kai_pulse: msg.receiver_pulse,
        receiver_pub_key: msg.receiver_pub_key,
        transfer_leaf_hash_receive: msg.transfer_leaf_hash_receive,
    })
}

// ---------------------------------------------------------------------------
// Leaf hashes
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PayloadLeaf<'a> {
    name: &'a str,
    mime: &'a str,
    size: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferLeaf<'a> {
    sender_signature: &'a str,
    sender_stamp: &'a str,
    sender_kai_pulse: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<PayloadLeaf<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver_signature: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver_stamp: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver_kai_pulse: Option<u64>,
}

impl<'a> TransferLeaf<'a> {
    fn sender_side(t: &'a TransferRecord) -> Self {
        Self {
            sender_signature: &t.sender_signature,
            sender_stamp: &t.sender_stamp,
            sender_kai_pulse: t.sender_kai_pulse,
            payload: t.payload.as_ref().map(|p| PayloadLeaf {
                name: &p.name,
                mime: &p.mime,
                size: p.size,
            }),
            receiver_signature: None,
            receiver_stamp: None,
            receiver_kai_pulse: None,
        }
    }

    fn full(t: &'a TransferRecord) -> Self {
        let non_empty = |s: &'a Option<String>| s.as_deref().filter(|v| !v.is_empty());
        Self {
            receiver_signature: non_empty(&t.receiver_signature),
            receiver_stamp: non_empty(&t.receiver_stamp),
            receiver_kai_pulse: t.receiver_kai_pulse,
            ..Self::sender_side(t)
        }
    }

    fn hash(&self) -> Result<HashHex, LedgerError> {
        Ok(sha256_hex(serde_json::to_vec(self)?))
    }
}

/// Leaf over sender fields only; stable across receive.
pub fn hash_transfer_sender_side(t: &TransferRecord) -> Result<HashHex, LedgerError> {
    TransferLeaf::sender_side(t).hash()
}

/// Leaf over sender and any receiver fields; the Merkle leaf of the window
/// and of sealed segments.
pub fn hash_transfer(t: &TransferRecord) -> Result<HashHex, LedgerError> {
    TransferLeaf::full(t).hash()
}

/// 16 random bytes as 32 lowercase hex chars.
pub fn generate_nonce() -> String {
    sigil_core::hex_encode(rand::random::<[u8; 16]>())
}

/// `hash("{receiverSignature}-{senderStamp}-{pulse}")`.
pub fn receiver_stamp(receiver_signature: &str, sender_stamp: &str, pulse: u64) -> HashHex {
    hash_str(&format!("{receiver_signature}-{sender_stamp}-{pulse}"))
}
