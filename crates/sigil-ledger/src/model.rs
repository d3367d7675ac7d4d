//! # Ledger Data Model
//!
//! Wire types for the head document and its archives. JSON field names are
//! the compatibility surface with existing sigil documents and must not
//! change.
//!
//! Hash-bearing fields of [`HardenedTransfer`] stay raw strings so that a
//! tampered document still parses and the offline verifier can name the
//! defect. Head-level roots are parsed as [`HashHex`]; an empty string is
//! read as absent.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use sigil_core::HashHex;
use sigil_zkp::{ZkBundle, ZkStamp};

use crate::error::LedgerError;
use crate::head;

/// Auto-seal cap applied when a head does not name its own `segmentSize`.
pub const DEFAULT_SEGMENT_SIZE: u64 = 2000;

/// File attached to a transfer. Only `name`, `mime` and `size` enter the
/// leaf hash; `encoded` is the base64 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub name: String,
    pub mime: String,
    pub size: u64,
    #[serde(default)]
    pub encoded: String,
}

/// One live-window transfer. Open until a receiver signature is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub sender_signature: String,
    pub sender_stamp: String,
    pub sender_kai_pulse: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_stamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_kai_pulse: Option<u64>,
}

impl TransferRecord {
    pub fn is_closed(&self) -> bool {
        self.receiver_signature
            .as_deref()
            .is_some_and(|s| !s.is_empty())
    }
}

/// Signed, head-pinned companion of a [`TransferRecord`], index-aligned
/// with the live window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardenedTransfer {
    #[serde(default)]
    pub previous_head_root: String,
    #[serde(default)]
    pub sender_pub_key: String,
    #[serde(default)]
    pub sender_sig: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_kai_pulse: Option<u64>,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub transfer_leaf_hash_send: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_sig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_kai_pulse: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_leaf_hash_receive: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_send: Option<ZkStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_send_bundle: Option<ZkBundle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_receive: Option<ZkStamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_receive_bundle: Option<ZkBundle>,
}

impl HardenedTransfer {
    /// Both receiver fields needed to check the receive side are present.
    pub fn has_receive_side(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.receiver_sig) && present(&self.receiver_pub_key)
    }
}

/// Summary of one sealed segment as recorded in the head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEntry {
    pub index: u64,
    pub root: HashHex,
    pub cid: HashHex,
    pub count: u64,
}

/// Immutable archive of a sealed window.
///
/// Field order is significant: the content id is the hash of this struct
/// serialized in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentFile {
    pub version: u32,
    pub segment_index: u64,
    pub segment_range: [u64; 2],
    pub segment_root: HashHex,
    pub head_hash_at_seal: HashHex,
    pub leaf_hash: String,
    pub transfers: Vec<TransferRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hardened_transfers: Vec<HardenedTransfer>,
}

impl SegmentFile {
    pub const VERSION: u32 = 1;
    pub const LEAF_HASH: &'static str = "sha256";

    /// Content id: SHA-256 of the compact JSON serialization.
    pub fn cid(&self) -> Result<HashHex, LedgerError> {
        Ok(sigil_core::sha256_hex(serde_json::to_vec(self)?))
    }
}

/// The mutable per-asset head document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadState {
    pub pulse: u64,
    pub beat: u64,
    pub step_index: u64,
    pub chakra_day: String,
    pub kai_signature: String,
    #[serde(default, alias = "userPhiKey", skip_serializing_if = "Option::is_none")]
    pub user_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_public_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention_sigil: Option<String>,

    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
    #[serde(default)]
    pub segments: Vec<SegmentEntry>,
    #[serde(
        default,
        deserialize_with = "empty_hash_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub segments_merkle_root: Option<HashHex>,
    #[serde(default)]
    pub cumulative_transfers: u64,
    #[serde(
        default,
        deserialize_with = "empty_hash_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub transfers_window_root: Option<HashHex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_base_phi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_spent_phi: Option<String>,
    #[serde(default)]
    pub hardened_transfers: Vec<HardenedTransfer>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_size: Option<u64>,
    #[serde(
        default,
        deserialize_with = "empty_hash_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub head_hash_at_seal: Option<HashHex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zk_verifying_key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation: Option<Value>,

    /// Fields this crate does not model, preserved on round trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HeadState {
    /// A fresh head with no history.
    pub fn new(
        pulse: u64,
        beat: u64,
        step_index: u64,
        chakra_day: impl Into<String>,
        kai_signature: impl Into<String>,
    ) -> Self {
        Self {
            pulse,
            beat,
            step_index,
            chakra_day: chakra_day.into(),
            kai_signature: kai_signature.into(),
            user_key: None,
            creator_public_key: None,
            intention_sigil: None,
            transfers: Vec::new(),
            segments: Vec::new(),
            segments_merkle_root: None,
            cumulative_transfers: 0,
            transfers_window_root: None,
            branch_base_phi: None,
            branch_spent_phi: None,
            hardened_transfers: Vec::new(),
            segment_size: None,
            head_hash_at_seal: None,
            transfer_nonce: None,
            zk_verifying_key: None,
            valuation: None,
            extra: Map::new(),
        }
    }

    /// Parse a head document, failing fast on malformed JSON or missing
    /// identity fields.
    ///
    /// A missing `cumulativeTransfers` is derived from the segments and the
    /// live window, and a missing `segmentsMerkleRoot` is rebuilt from the
    /// segment roots.
    pub fn from_json(input: &str) -> Result<Self, LedgerError> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| LedgerError::Structural(e.to_string()))?;
        if !value.is_object() {
            return Err(LedgerError::Structural(
                "head document must be a JSON object".into(),
            ));
        }
        let has_cumulative = value
            .get("cumulativeTransfers")
            .is_some_and(Value::is_u64);

        let mut head: HeadState =
            serde_json::from_value(value).map_err(|e| LedgerError::Structural(e.to_string()))?;

        if !has_cumulative {
            head.cumulative_transfers = head::sum_segments(&head) + head.transfers.len() as u64;
        }
        if head.segments_merkle_root.is_none() && !head.segments.is_empty() {
            head.segments_merkle_root = Some(head::segments_root(&head.segments));
        }
        Ok(head)
    }

    pub fn to_json_pretty(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Owner key bound into the head hash: the user key, else empty.
    pub fn owner_key(&self) -> &str {
        self.user_key.as_deref().unwrap_or("")
    }

    /// Auto-seal cap; never below one.
    pub fn segment_size_or_default(&self) -> u64 {
        self.segment_size.unwrap_or(DEFAULT_SEGMENT_SIZE).max(1)
    }

    /// `valuation.valuePhi` as a decimal string, when present.
    pub fn valuation_phi(&self) -> Option<String> {
        match self.valuation.as_ref()?.get("valuePhi")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

fn empty_hash_as_none<'de, D>(deserializer: D) -> Result<Option<HashHex>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => HashHex::parse(s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
