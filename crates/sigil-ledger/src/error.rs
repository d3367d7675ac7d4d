//! # Ledger Errors
//!
//! Only structural problems are errors. A head that parses but fails a
//! chain-integrity or signature check is handled by the offline verifier,
//! which reports findings instead of failing.

use sigil_core::{CanonicalizationError, EncodingError};
use sigil_crypto::MerkleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    /// The document is malformed or missing identity fields.
    #[error("structural error: {0}")]
    Structural(String),

    /// A send was attempted while the last window transfer is still open.
    #[error("transfer #{index} is still open; it must be received before the next send")]
    OpenTransferPending { index: usize },

    /// A receive was attempted with no open transfer in the window.
    #[error("no open transfer to receive")]
    NoOpenTransfer,

    /// The hardened chain and the live window are not index-aligned.
    #[error("hardened chain has {hardened} records but the live window has {window} transfers")]
    Misaligned { window: usize, hardened: usize },

    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
