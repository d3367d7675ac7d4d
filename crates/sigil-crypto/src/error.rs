//! # Cryptographic Error Types
//!
//! Structured errors for key handling, key persistence and Merkle proofs.

use sigil_core::EncodingError;
use thiserror::Error;

/// Errors from key import/export and signing.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// A key could not be decoded or does not match its counterpart.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A key could not be exported.
    #[error("key export failed: {0}")]
    Export(String),

    /// Text decoding of key material failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Errors from a [`KeyStore`](crate::keys::KeyStore) backend.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// The backend is disabled or cannot be reached.
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    /// The persisted record exists but cannot be parsed.
    #[error("key store record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// Filesystem failure.
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from Merkle proof construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The requested leaf index is past the end of the leaf set.
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
}
