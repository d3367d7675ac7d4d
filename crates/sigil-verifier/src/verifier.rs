//! # Offline Verifier
//!
//! Re-derives everything a head's hardened chain claims and reports each
//! disagreement as a human-readable issue. Verification never fails: a
//! head that parsed is always answered with a [`VerifyReport`].
//!
//! ## Checks per hardened record `#i`
//!
//! 1. Head pinning: `previousHeadRoot` equals the head hash with the
//!    cumulative count as it stood before transfer `i`.
//! 2. Nonce is 16-byte hex.
//! 3. Sender-side leaf hash equals the window transfer's, when present.
//! 4. Send signature over the canonical send message.
//! 5. Receive leaf hash and signature, when the record has a receiver.
//! 6. ZK stamps against their bundles, then best-effort proof verification.
//! 7. Sender pulses never decrease.
//!
//! Identity anchoring (`creatorPublicKey` against `userKey`) is reported
//! under `advisories` and does not affect `ok`.

use serde::{Serialize, Serializer};
use serde_json::Value;
use sigil_core::{is_hex_of_len, HashHex};
use sigil_crypto::{identity_key_from_public_key, verify};
use sigil_ledger::{
    build_receive_message, build_send_message, hash_transfer, hash_transfer_sender_side, head,
    HardenedTransfer, HeadState, ReceiveMessage, SendMessage, SigilIdentity,
};
use sigil_zkp::{ZkBridge, ZkBundle, ZkStamp, ZkVerifyRequest};

use crate::config::VerificationConfig;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Whether a recorded leaf hash matched the window transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafStatus {
    Ok,
    Mismatch,
    /// No window transfer at this index to compare against.
    MissingWindow,
}

impl LeafStatus {
    fn from_match(ok: bool) -> Self {
        if ok {
            Self::Ok
        } else {
            Self::Mismatch
        }
    }
}

/// `true`, `false`, or `"missing-window"` on the wire.
impl Serialize for LeafStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ok => serializer.serialize_bool(true),
            Self::Mismatch => serializer.serialize_bool(false),
            Self::MissingWindow => serializer.serialize_str("missing-window"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkEntry {
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stamp_hash_ok: Option<bool>,
    /// `None` (serialized as `null`) when no backend ran.
    pub verified: Option<bool>,
}

impl ZkEntry {
    fn stamp_only() -> Self {
        Self {
            present: false,
            stamp_hash_ok: None,
            verified: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideCheck {
    pub sig_ok: bool,
    pub leaf_ok: LeafStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zk: Option<ZkEntry>,
}

impl SideCheck {
    fn unchecked() -> Self {
        Self {
            sig_ok: false,
            leaf_ok: LeafStatus::MissingWindow,
            zk: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub index: usize,
    pub prev_head_ok: bool,
    pub send: SideCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receive: Option<SideCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyReport {
    pub ok: bool,
    pub count: usize,
    pub issues: Vec<String>,
    pub advisories: Vec<String>,
    pub entries: Vec<Entry>,
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

pub struct OfflineVerifier {
    config: VerificationConfig,
    bridge: ZkBridge,
}

impl OfflineVerifier {
    pub fn new(config: VerificationConfig, bridge: ZkBridge) -> Self {
        Self { config, bridge }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    /// Verify `head`, yielding to the runtime every `batch_size` entries.
    pub async fn verify(&self, head: &HeadState) -> VerifyReport {
        let batch = self.config.batch_size.max(1);
        let mut run = Run::new(self, head);
        for i in 0..head.hardened_transfers.len() {
            if i > 0 && i % batch == 0 {
                tokio::task::yield_now().await;
            }
            run.check(i);
        }
        run.finish()
    }

    /// Same checks and result as [`verify`](Self::verify), without yielding.
    pub fn verify_blocking(&self, head: &HeadState) -> VerifyReport {
        let mut run = Run::new(self, head);
        for i in 0..head.hardened_transfers.len() {
            run.check(i);
        }
        run.finish()
    }

    fn check_zk(
        &self,
        stamp: Option<&ZkStamp>,
        bundle: &ZkBundle,
        fallback: Option<&Value>,
    ) -> ZkEntry {
        let stamp_hash_ok = stamp.is_some_and(|s| s.matches_bundle(bundle, fallback));
        let verified = self
            .bridge
            .try_verify(ZkVerifyRequest {
                proof: &bundle.proof,
                public_signals: &bundle.public_signals,
                vkey: bundle.vkey.as_ref(),
                fallback_vkey: fallback,
            })
            .as_option();
        ZkEntry {
            present: true,
            stamp_hash_ok: Some(stamp_hash_ok),
            verified,
        }
    }
}

/// State of one verification pass. Everything derivable up front is
/// computed in [`Run::new`].
struct Run<'a> {
    verifier: &'a OfflineVerifier,
    head: &'a HeadState,
    identity: SigilIdentity,
    fallback_vkey: Option<&'a Value>,
    prev_roots: Vec<Option<HashHex>>,
    send_leaves: Vec<Option<HashHex>>,
    recv_leaves: Vec<Option<HashHex>>,
    issues: Vec<String>,
    advisories: Vec<String>,
    entries: Vec<Entry>,
}

impl<'a> Run<'a> {
    fn new(verifier: &'a OfflineVerifier, head: &'a HeadState) -> Self {
        let hardened = &head.hardened_transfers;
        let base = head::sum_segments(head);
        let prev_roots = (0..hardened.len())
            .map(|i| head::compute(head, Some(base + i as u64)).ok())
            .collect();
        let window = |i: usize| head.transfers.get(i);
        let send_leaves = (0..hardened.len())
            .map(|i| window(i).and_then(|t| hash_transfer_sender_side(t).ok()))
            .collect();
        let recv_leaves = (0..hardened.len())
            .map(|i| window(i).and_then(|t| hash_transfer(t).ok()))
            .collect();

        let mut advisories = Vec::new();
        if let (Some(creator), Some(user_key)) =
            (head.creator_public_key.as_deref(), head.user_key.as_deref())
        {
            match identity_key_from_public_key(creator) {
                Ok(derived) if derived == user_key => {}
                Ok(_) => advisories.push("Φ anchor mismatch (informational)".to_string()),
                Err(e) => {
                    tracing::debug!(error = %e, "creator public key could not be decoded");
                    advisories.push("Φ anchor decode failed (informational)".to_string());
                }
            }
        }

        Self {
            verifier,
            head,
            identity: SigilIdentity::from_head(head),
            fallback_vkey: head
                .zk_verifying_key
                .as_ref()
                .or(verifier.config.fallback_vkey.as_ref()),
            prev_roots,
            send_leaves,
            recv_leaves,
            issues: Vec::new(),
            advisories,
            entries: Vec::with_capacity(hardened.len()),
        }
    }

    fn check(&mut self, i: usize) {
        let head = self.head;
        let t = &head.hardened_transfers[i];

        let prev_head_ok = self.prev_roots[i]
            .as_ref()
            .is_some_and(|root| root.as_str() == t.previous_head_root);
        if !prev_head_ok {
            self.issues.push(format!("prevHead mismatch at #{i}"));
        }

        if !is_hex_of_len(&t.nonce, 16) {
            self.issues
                .push(format!("nonce invalid at #{i} (expected 16-byte hex)"));
        }

        let mut send = SideCheck::unchecked();
        if let Some(leaf) = &self.send_leaves[i] {
            send.leaf_ok = LeafStatus::from_match(leaf.as_str() == t.transfer_leaf_hash_send);
            if send.leaf_ok == LeafStatus::Mismatch {
                self.issues
                    .push(format!("sender-side leaf hash mismatch at #{i}"));
            }
        }
        send.sig_ok = self.send_signature_ok(t);
        if !send.sig_ok {
            self.issues.push(format!("send signature invalid at #{i}"));
        }

        let mut receive = None;
        if t.has_receive_side() {
            let mut side = SideCheck::unchecked();
            if let Some(leaf) = &self.recv_leaves[i] {
                let recorded = t.transfer_leaf_hash_receive.as_deref().unwrap_or("");
                side.leaf_ok = LeafStatus::from_match(leaf.as_str() == recorded);
                if side.leaf_ok == LeafStatus::Mismatch {
                    self.issues.push(format!("receive leaf hash mismatch at #{i}"));
                }
            }
            side.sig_ok = receive_signature_ok(t);
            if !side.sig_ok {
                self.issues
                    .push(format!("receive signature invalid at #{i}"));
            }
            receive = Some(side);
        }

        if let Some(bundle) = &t.zk_send_bundle {
            let zk = self
                .verifier
                .check_zk(t.zk_send.as_ref(), bundle, self.fallback_vkey);
            self.record_zk("SEND", i, &zk);
            send.zk = Some(zk);
        } else if t.zk_send.is_some() {
            send.zk = Some(ZkEntry::stamp_only());
        }

        if let Some(bundle) = &t.zk_receive_bundle {
            let zk = self
                .verifier
                .check_zk(t.zk_receive.as_ref(), bundle, self.fallback_vkey);
            self.record_zk("RECV", i, &zk);
            receive.get_or_insert_with(SideCheck::unchecked).zk = Some(zk);
        } else if let (Some(side), Some(_)) = (receive.as_mut(), t.zk_receive.as_ref()) {
            side.zk = Some(ZkEntry::stamp_only());
        }

        if i > 0 {
            let prev = head.hardened_transfers[i - 1].sender_kai_pulse;
            if let (Some(prev), Some(cur)) = (prev, t.sender_kai_pulse) {
                if cur < prev {
                    self.issues
                        .push(format!("senderKaiPulse decreased at #{i}"));
                }
            }
        }

        self.entries.push(Entry {
            index: i,
            prev_head_ok,
            send,
            receive,
        });
    }

    fn record_zk(&mut self, side: &str, i: usize, zk: &ZkEntry) {
        if zk.stamp_hash_ok == Some(false) {
            self.issues
                .push(format!("ZK {side} stamp/bundle hash mismatch at #{i}"));
        }
        if zk.verified == Some(false) {
            self.issues
                .push(format!("ZK {side} verification failed at #{i}"));
        }
    }

    fn send_signature_ok(&self, t: &HardenedTransfer) -> bool {
        if t.sender_pub_key.is_empty() {
            return false;
        }
        let message = build_send_message(&SendMessage {
            identity: &self.identity,
            previous_head_root: &t.previous_head_root,
            sender_pulse: t.sender_kai_pulse.unwrap_or(0),
            sender_pub_key: &t.sender_pub_key,
            nonce: &t.nonce,
            transfer_leaf_hash_send: &t.transfer_leaf_hash_send,
        });
        message.is_ok_and(|m| verify(&t.sender_pub_key, m.as_bytes(), &t.sender_sig))
    }

    fn finish(self) -> VerifyReport {
        let report = VerifyReport {
            ok: self.issues.is_empty(),
            count: self.entries.len(),
            issues: self.issues,
            advisories: self.advisories,
            entries: self.entries,
        };
        tracing::info!(
            ok = report.ok,
            count = report.count,
            issues = report.issues.len(),
            advisories = report.advisories.len(),
            "offline verification complete"
        );
        report
    }
}

fn receive_signature_ok(t: &HardenedTransfer) -> bool {
    let (Some(pub_key), Some(sig)) = (t.receiver_pub_key.as_deref(), t.receiver_sig.as_deref())
    else {
        return false;
    };
    let message = build_receive_message(&ReceiveMessage {
        previous_head_root: &t.previous_head_root,
        sender_sig: &t.sender_sig,
        receiver_pulse: t.receiver_kai_pulse.unwrap_or(0),
        receiver_pub_key: pub_key,
        transfer_leaf_hash_receive: t.transfer_leaf_hash_receive.as_deref().unwrap_or(""),
    });
    message.is_ok_and(|m| verify(pub_key, m.as_bytes(), sig))
}

// ---------------------------------------------------------------------------
// Stamp annotation
// ---------------------------------------------------------------------------

/// Verify every attached bundle and record the outcome in its stamp's
/// `verified` flag. An unavailable backend records `false`. Returns the
/// number of stamps updated.
pub fn annotate_zk_verification(
    head: &mut HeadState,
    bridge: &ZkBridge,
    fallback_vkey: Option<&Value>,
) -> usize {
    let inline = head.zk_verifying_key.clone();
    let fallback = inline.as_ref().or(fallback_vkey);
    let mut updated = 0;

    let mut annotate = |stamp: &mut Option<ZkStamp>, bundle: &Option<ZkBundle>| {
        if let (Some(stamp), Some(bundle)) = (stamp.as_mut(), bundle.as_ref()) {
            let res = bridge.try_verify(ZkVerifyRequest {
                proof: &bundle.proof,
                public_signals: &bundle.public_signals,
                vkey: bundle.vkey.as_ref(),
                fallback_vkey: fallback,
            });
            stamp.verified = Some(res.is_verified());
            updated += 1;
        }
    };
    for t in &mut head.hardened_transfers {
        annotate(&mut t.zk_send, &t.zk_send_bundle);
        annotate(&mut t.zk_receive, &t.zk_receive_bundle);
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_crypto::Keypair;
    use sigil_ledger::{Ledger, ReceiveRequest, SendRequest};
    use sigil_zkp::MockProofBackend;
    use std::sync::Arc;

    fn verifier() -> OfflineVerifier {
        OfflineVerifier::new(VerificationConfig::default(), ZkBridge::unavailable())
    }

    fn chain(n: u64, prover: Option<&MockProofBackend>) -> HeadState {
        let sender = Keypair::generate();
        let receiver = Keypair::generate();
        let mut ledger = Ledger::new(HeadState::new(500, 1, 1, "Crown", "aa".repeat(32)));
        for k in 0..n {
            let p = prover.map(|p| p as &dyn sigil_zkp::ProofProvider);
            ledger
                .send(
                    &sender,
                    SendRequest {
                        sender_signature: format!("s{k}"),
                        sender_stamp: format!("st{k}"),
                        pulse: 500 + 2 * k,
                        payload: None,
                    },
                    p,
                )
                .unwrap();
            ledger
                .receive(
                    &receiver,
                    ReceiveRequest {
                        receiver_signature: format!("r{k}"),
                        pulse: 501 + 2 * k,
                    },
                    p,
                )
                .unwrap();
        }
        ledger.into_head()
    }

    #[test]
    fn clean_chain_verifies() {
        let head = chain(3, None);
        let report = verifier().verify_blocking(&head);
        assert!(report.ok, "{:?}", report.issues);
        assert_eq!(report.count, 3);
        for e in &report.entries {
            assert!(e.prev_head_ok);
            assert!(e.send.sig_ok);
            assert_eq!(e.send.leaf_ok, LeafStatus::Ok);
            let r = e.receive.as_ref().unwrap();
            assert!(r.sig_ok);
            assert_eq!(r.leaf_ok, LeafStatus::Ok);
        }
    }

    #[tokio::test]
    async fn async_matches_blocking() {
        let head = chain(20, None);
        let v = OfflineVerifier::new(
            VerificationConfig::default().with_batch_size(3),
            ZkBridge::unavailable(),
        );
        assert_eq!(v.verify(&head).await, v.verify_blocking(&head));
    }

    #[test]
    fn tampered_nonce_breaks_signature() {
        let mut head = chain(2, None);
        head.hardened_transfers[1].nonce = "00".repeat(16);
        let report = verifier().verify_blocking(&head);
        assert_eq!(report.issues, vec!["send signature invalid at #1".to_string()]);
        let mut head = chain(1, None);
        head.hardened_transfers[0].nonce = "xyz".into();
        let report = verifier().verify_blocking(&head);
        assert!(report
            .issues
            .contains(&"nonce invalid at #0 (expected 16-byte hex)".to_string()));
    }

    #[test]
    fn missing_window_reported_as_such() {
        let mut head = chain(2, None);
        head.transfers.truncate(1);
        let report = verifier().verify_blocking(&head);
        assert_eq!(report.entries[1].send.leaf_ok, LeafStatus::MissingWindow);
        assert!(report.entries[1].send.sig_ok);
        let wire = serde_json::to_value(&report.entries[1]).unwrap();
        assert_eq!(wire["send"]["leafOk"], "missing-window");
        assert_eq!(wire["prevHeadOk"], true);
    }

    #[test]
    fn receive_leaf_mismatch_detected() {
        let mut head = chain(1, None);
        head.transfers[0].receiver_stamp = Some("forged".into());
        let report = verifier().verify_blocking(&head);
        assert_eq!(report.issues, vec!["receive leaf hash mismatch at #0".to_string()]);
    }

    #[test]
    fn decreasing_pulse_is_an_issue_not_a_stop() {
        let mut head = chain(2, None);
        head.hardened_transfers[1].sender_kai_pulse = Some(1);
        let report = verifier().verify_blocking(&head);
        assert!(report
            .issues
            .contains(&"senderKaiPulse decreased at #1".to_string()));
        assert_eq!(report.count, 2);
    }

    #[test]
    fn anchor_findings_are_advisories() {
        let mut head = chain(1, None);
        head.user_key = Some("1NotTheCreator".into());
        let report = verifier().verify_blocking(&head);
        assert!(report.ok);
        assert_eq!(report.advisories, vec!["Φ anchor mismatch (informational)".to_string()]);

        head.creator_public_key = Some("!!".into());
        let report = verifier().verify_blocking(&head);
        assert_eq!(
            report.advisories,
            vec!["Φ anchor decode failed (informational)".to_string()]
        );

        let creator = head.hardened_transfers[0].sender_pub_key.clone();
        head.user_key = Some(identity_key_from_public_key(&creator).unwrap());
        head.creator_public_key = Some(creator);
        assert!(verifier().verify_blocking(&head).advisories.is_empty());
    }

    #[test]
    fn zk_unavailable_reports_null() {
        let backend = MockProofBackend::new();
        let head = chain(1, Some(&backend));
        let report = verifier().verify_blocking(&head);
        assert!(report.ok, "{:?}", report.issues);
        let zk = report.entries[0].send.zk.as_ref().unwrap();
        assert_eq!(zk.stamp_hash_ok, Some(true));
        assert_eq!(zk.verified, None);

        let json = serde_json::to_value(&report).unwrap();
        let zk = &json["entries"][0]["send"]["zk"];
        assert_eq!(zk.get("verified"), Some(&serde_json::Value::Null));
        assert_eq!(zk["stampHashOk"], serde_json::json!(true));
    }

    #[test]
    fn zk_mock_backend_verifies_and_detects_swaps() {
        let backend = Arc::new(MockProofBackend::new());
        let mut head = chain(2, Some(&*backend));
        let v = OfflineVerifier::new(
            VerificationConfig::default(),
            ZkBridge::with_verifier(backend.clone()),
        );
        let report = v.verify_blocking(&head);
        assert!(report.ok, "{:?}", report.issues);
        let recv = report.entries[1].receive.as_ref().unwrap();
        assert_eq!(recv.zk.as_ref().unwrap().verified, Some(true));

        if let Some(b) = head.hardened_transfers[1].zk_receive_bundle.as_mut() {
            b.public_signals = serde_json::json!(["forged"]);
        }
        let report = v.verify_blocking(&head);
        assert_eq!(
            report.issues,
            vec![
                "ZK RECV stamp/bundle hash mismatch at #1".to_string(),
                "ZK RECV verification failed at #1".to_string(),
            ]
        );
    }

    #[test]
    fn annotation_sets_stamp_flags() {
        let backend = Arc::new(MockProofBackend::new());
        let mut head = chain(2, Some(&*backend));
        let n = annotate_zk_verification(&mut head, &ZkBridge::with_verifier(backend), None);
        assert_eq!(n, 4);
        assert!(head
            .hardened_transfers
            .iter()
            .all(|t| t.zk_send.as_ref().unwrap().verified == Some(true)));

        let n = annotate_zk_verification(&mut head, &ZkBridge::unavailable(), None);
        assert_eq!(n, 4);
        assert_eq!(head.hardened_transfers[0].zk_send.as_ref().unwrap().verified, Some(false));
    }
}
