//! # Ledger Lifecycle
//!
//! Send, receive and seal across the ledger, head chain and history
//! modules, checked end to end with the offline verifier.

use sigil_crypto::Keypair;
use sigil_ledger::{
    build_head_window_bundle, build_segment_bundle, head, segment_file_matches, seal_window,
    verify_historical, HeadState, Ledger, LedgerError, ProofBundle, ReceiveRequest,
    SealOutcome, SendRequest,
};
use sigil_verifier::{OfflineVerifier, VerificationConfig};
use sigil_zkp::ZkBridge;

fn genesis() -> HeadState {
    HeadState::new(2000, 6, 3, "Solar Plexus", "5e".repeat(32))
}

fn send(ledger: &mut Ledger, key: &Keypair, k: u64) {
    ledger
        .send(
            key,
            SendRequest {
                sender_signature: format!("sender-{k}"),
                sender_stamp: format!("stamp-{k}"),
                pulse: 2000 + 2 * k,
                payload: None,
            },
            None,
        )
        .unwrap();
}

fn receive(ledger: &mut Ledger, key: &Keypair, k: u64) {
    ledger
        .receive(
            key,
            ReceiveRequest {
                receiver_signature: format!("receiver-{k}"),
                pulse: 2001 + 2 * k,
            },
            None,
        )
        .unwrap();
}

fn verifier() -> OfflineVerifier {
    OfflineVerifier::new(VerificationConfig::default(), ZkBridge::unavailable())
}

// =========================================================================
// Head pinning across a seal
// =========================================================================

#[test]
fn send_after_sealing_five_pins_to_cumulative_count() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    for k in 0..5 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    let sealed = ledger.seal().unwrap().expect("five closed transfers seal");
    assert_eq!(sealed.segment_file.transfers.len(), 5);
    assert_eq!(sealed.segment_file.segment_range, [0, 4]);
    assert_eq!(ledger.head().cumulative_transfers, 5);

    let sealed_head = ledger.head().clone();
    send(&mut ledger, &a, 5);
    let pin = &ledger.head().hardened_transfers[0].previous_head_root;
    assert_eq!(
        pin.as_str(),
        head::compute(&sealed_head, Some(5)).unwrap().as_str()
    );
    assert_ne!(
        pin.as_str(),
        head::compute(&sealed_head, Some(0)).unwrap().as_str()
    );

    let report = verifier().verify_blocking(ledger.head());
    assert!(report.ok, "{:?}", report.issues);
    assert_eq!(report.count, 1);
}

#[test]
fn chain_verifies_through_several_seals() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    let mut k = 0;
    for round in 0..3 {
        for _ in 0..=round {
            send(&mut ledger, &a, k);
            receive(&mut ledger, &b, k);
            k += 1;
        }
        let report = verifier().verify_blocking(ledger.head());
        assert!(report.ok, "round {round}: {:?}", report.issues);
        ledger.seal().unwrap();
    }
    assert_eq!(ledger.head().segments.len(), 3);
    assert_eq!(ledger.head().cumulative_transfers, 6);
    assert_eq!(head::sum_segments(ledger.head()), 6);
}

// =========================================================================
// Seal behavior
// =========================================================================

#[test]
fn lone_open_transfer_is_never_sealed() {
    let a = Keypair::generate();
    let mut ledger = Ledger::new(genesis());
    send(&mut ledger, &a, 0);
    let before = ledger.head().clone();

    assert_eq!(seal_window(&before).unwrap(), SealOutcome::Unchanged);
    assert!(ledger.seal().unwrap().is_none());
    assert!(ledger.seal().unwrap().is_none());
    assert_eq!(ledger.head(), &before);
}

#[test]
fn manual_seal_leaves_open_transfer_with_stale_pin() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    for k in 0..2 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    send(&mut ledger, &a, 2);
    let pin = ledger.head().hardened_transfers[2].previous_head_root.clone();

    let sealed = ledger.seal().unwrap().expect("closed prefix seals");
    assert_eq!(sealed.segment_file.transfers.len(), 2);
    assert_eq!(sealed.segment_file.hardened_transfers.len(), 2);
    let state = ledger.head();
    assert_eq!(state.transfers.len(), 1);
    assert_eq!(state.hardened_transfers.len(), 1);
    assert_eq!(state.hardened_transfers[0].previous_head_root, pin);
    assert_ne!(pin.as_str(), head::compute(state, Some(2)).unwrap().as_str());

    let report = verifier().verify_blocking(state);
    assert_eq!(report.issues, vec!["prevHead mismatch at #0".to_string()]);
    assert!(!report.entries[0].prev_head_ok);
    assert!(report.entries[0].send.sig_ok);
    assert!(report.entries[0].receive.is_none());
}

#[test]
fn window_full_triggers_seal_before_append() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut state = genesis();
    state.segment_size = Some(3);
    let mut ledger = Ledger::new(state);
    for k in 0..3 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    let outcome = ledger
        .send(
            &a,
            SendRequest {
                sender_signature: "sender-3".into(),
                sender_stamp: "stamp-3".into(),
                pulse: 2006,
                payload: None,
            },
            None,
        )
        .unwrap();
    let sealed = outcome.sealed.expect("auto-seal");
    assert_eq!(sealed.segment_file.transfers.len(), 3);
    assert_eq!(outcome.window_index, 0);
    assert_eq!(ledger.head().transfers.len(), 1);
    assert_eq!(ledger.head().cumulative_transfers, 4);

    let report = verifier().verify_blocking(ledger.head());
    assert!(report.ok, "{:?}", report.issues);
}

#[test]
fn send_refuses_while_last_transfer_open() {
    let a = Keypair::generate();
    let mut ledger = Ledger::new(genesis());
    send(&mut ledger, &a, 0);
    let err = ledger
        .send(
            &a,
            SendRequest {
                sender_signature: "again".into(),
                sender_stamp: "again".into(),
                pulse: 2010,
                payload: None,
            },
            None,
        )
        .unwrap_err();
    assert!(matches!(err, LedgerError::OpenTransferPending { index: 0 }));
}

// =========================================================================
// Historical inclusion
// =========================================================================

#[test]
fn bundles_for_live_and_archived_transfers() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    for k in 0..4 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    let first = ledger.seal().unwrap().unwrap();
    for k in 4..7 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    let second = ledger.seal().unwrap().unwrap();
    send(&mut ledger, &a, 7);
    receive(&mut ledger, &b, 7);
    let state = ledger.head();

    assert!(segment_file_matches(state, &first.segment_file));
    assert!(segment_file_matches(state, &second.segment_file));

    for i in 0..4 {
        let bundle = ProofBundle::Segment(
            build_segment_bundle(state, &first.segment_file, i).unwrap(),
        );
        assert!(verify_historical(state, &bundle), "first segment #{i}");
    }
    let bundle =
        ProofBundle::Segment(build_segment_bundle(state, &second.segment_file, 2).unwrap());
    assert!(verify_historical(state, &bundle));

    let live = ProofBundle::Head(build_head_window_bundle(state, 0).unwrap());
    assert!(verify_historical(state, &live));

    // A bundle from one segment does not verify as another.
    let mut forged = build_segment_bundle(state, &first.segment_file, 0).unwrap();
    forged.segment_index = second.segment_file.segment_index;
    assert!(!verify_historical(state, &ProofBundle::Segment(forged)));
}

#[test]
fn edited_segment_file_no_longer_matches() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    for k in 0..2 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    let mut sealed = ledger.seal().unwrap().unwrap();
    sealed.segment_file.transfers[1].sender_kai_pulse += 1;
    assert!(!segment_file_matches(ledger.head(), &sealed.segment_file));
}

// =========================================================================
// Persistence
// =========================================================================

#[test]
fn head_survives_json_round_trip_and_still_verifies() {
    let (a, b) = (Keypair::generate(), Keypair::generate());
    let mut ledger = Ledger::new(genesis());
    for k in 0..3 {
        send(&mut ledger, &a, k);
        receive(&mut ledger, &b, k);
    }
    ledger.seal().unwrap();
    send(&mut ledger, &a, 3);

    let json = ledger.head().to_json_pretty().unwrap();
    let reloaded = HeadState::from_json(&json).unwrap();
    assert_eq!(&reloaded, ledger.head());
    assert!(verifier().verify_blocking(&reloaded).ok);
}
