//! # Text Encodings
//!
//! The encodings that appear inside sigil documents:
//!
//! - **hex** for digests and nonces,
//! - **base64url without padding** for keys and signatures,
//! - **standard base64** for embedded payloads,
//! - **Base58Check** for identity keys.
//!
//! Decoders are lenient about padding; encoders never pad base64url.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;

use crate::digest::sha256_bytes;
use crate::error::EncodingError;

const PAD_INDIFFERENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_PADDED: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PAD_INDIFFERENT);

// ---------------------------------------------------------------------------
// hex
// ---------------------------------------------------------------------------

/// Lowercase hex.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decode hex of either case.
pub fn hex_decode(s: &str) -> Result<Vec<u8>, EncodingError> {
    hex::decode(s.trim()).map_err(|e| EncodingError::Hex(e.to_string()))
}

/// True when `s` is hex (either case) encoding exactly `bytes` bytes.
pub fn is_hex_of_len(s: &str, bytes: usize) -> bool {
    s.len() == bytes * 2 && !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// base64 / base64url
// ---------------------------------------------------------------------------

/// Standard base64 with padding.
pub fn base64_encode(bytes: impl AsRef<[u8]>) -> String {
    STANDARD_PADDED.encode(bytes)
}

/// Standard base64; padding optional.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, EncodingError> {
    STANDARD_PADDED
        .decode(s.trim())
        .map_err(|e| EncodingError::Base64(e.to_string()))
}

/// URL-safe base64 with no padding.
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

/// URL-safe base64. Accepts padded input and the `+`/`/` characters of the
/// standard alphabet.
pub fn base64url_decode(s: &str) -> Result<Vec<u8>, EncodingError> {
    let normalized: String = s
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_LENIENT
        .decode(normalized)
        .map_err(|e| EncodingError::Base64(e.to_string()))
}

// ---------------------------------------------------------------------------
// Base58 / Base58Check
// ---------------------------------------------------------------------------

/// Bitcoin-alphabet Base58. Each leading zero byte becomes one leading `'1'`.
pub fn base58_encode(bytes: &[u8]) -> String {
    bs58::encode(bytes).into_string()
}

/// Base58Check: `version ‖ payload ‖ checksum`, where the checksum is the
/// first four bytes of `SHA-256(SHA-256(version ‖ payload))`.
pub fn base58_check(payload: &[u8], version: u8) -> String {
    let mut buf = Vec::with_capacity(payload.len() + 5);
    buf.push(version);
    buf.extend_from_slice(payload);
    let check = sha256_bytes(&sha256_bytes(&buf));
    buf.extend_from_slice(&check[..4]);
    base58_encode(&buf)
}
