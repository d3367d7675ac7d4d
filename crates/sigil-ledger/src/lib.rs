//! # sigil-ledger — Provenance Ledger for Sigil Heads
//!
//! A sigil's head document carries its transfer history: a live window of
//! recent transfers, each paired with a signed, head-pinned hardened record,
//! and a list of sealed segments archiving older windows.
//!
//! ## Architecture
//!
//! - **Model** (`model.rs`): wire types for heads, transfers, hardened
//!   records and segment files.
//! - **Head chain** (`head.rs`): the canonical head hash every hardened
//!   transfer is pinned to.
//! - **Protocol** (`protocol.rs`): signed send/receive messages and
//!   transfer leaf hashes.
//! - **Sealer** (`segment.rs`): archives closed transfers and keeps branch
//!   accounting.
//! - **History** (`history.rs`): inclusion bundles for live and sealed
//!   transfers.
//! - **Ledger** (`ledger.rs`): the single-writer send/receive/seal facade.
//! - **Identity** (`identity.rs`): kai signature, owner key and chakra-day
//!   helpers.
//!
//! ## Crate Policy
//!
//! - Errors are structural only; integrity findings belong to
//!   `sigil-verifier`.
//! - Signed bytes are always built through `CanonicalBytes`.

pub mod error;
pub mod head;
pub mod history;
pub mod identity;
pub mod ledger;
pub mod model;
pub mod protocol;
pub mod segment;

pub use error::LedgerError;
pub use history::{
    build_head_window_bundle, build_segment_bundle, segment_file_matches, verify_historical,
    HeadWindowProofBundle, ProofBundle, SegmentProofBundle,
};
pub use identity::{
    compute_kai_signature, derive_user_key_from_signature, normalize_chakra_day, ChakraDay,
};
pub use ledger::{
    exhale_payload, Ledger, ReceiveOutcome, ReceiveRequest, SealedSegment, SendOutcome,
    SendRequest,
};
pub use model::{
    HardenedTransfer, HeadState, Payload, SegmentEntry, SegmentFile, TransferRecord,
    DEFAULT_SEGMENT_SIZE,
};
pub use protocol::{
    build_receive_message, build_send_message, generate_nonce, hash_transfer,
    hash_transfer_sender_side, receiver_stamp, ReceiveMessage, SendMessage, SigilIdentity,
};
pub use segment::{exhale_amount, seal_window, SealOutcome};
