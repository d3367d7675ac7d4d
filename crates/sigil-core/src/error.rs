//! # Error Types — Structured Error Hierarchy
//!
//! Errors shared by every crate in the workspace. All use `thiserror`.
//!
//! ## Design
//!
//! - Structural problems (malformed JSON, a hash that is not 64 hex chars,
//!   undecodable base64url) are errors and fail at the parse boundary.
//! - Chain-integrity and cryptographic findings are *not* errors: the
//!   offline verifier records them as report entries instead.

use thiserror::Error;

/// Top-level error type for the sigil ledger.
#[derive(Error, Debug)]
pub enum SigilError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A value could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// A document is structurally invalid.
    #[error("structural error: {0}")]
    Structural(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use a decimal string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in text encodings and hash identities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Not a 64-character hex string.
    #[error("invalid hash: expected 64 hex chars, got {0:?}")]
    InvalidHash(String),

    /// Hex decoding failed.
    #[error("hex decode error: {0}")]
    Hex(String),

    /// Base64 / base64url decoding failed.
    #[error("base64 decode error: {0}")]
    Base64(String),

    /// A decimal amount could not be parsed.
    #[error("invalid decimal amount: {0:?}")]
    InvalidDecimal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_hash_display_includes_input() {
        let err = EncodingError::InvalidHash("abc".into());
        assert!(err.to_string().contains("\"abc\""));
    }

    #[test]
    fn structural_wraps_into_sigil_error() {
        let err: SigilError = EncodingError::Base64("bad".into()).into();
        assert!(format!("{err}").starts_with("encoding error"));
    }
}
