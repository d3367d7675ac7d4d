//! # sigil-core — Foundational Types for the Sigil Ledger
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other crate builds on: the bytes that get hashed and signed, the
//! identity of a hash, the text encodings used inside a sigil document, and
//! the fixed-point Phi amount used for branch accounting.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every signed message and every
//!    head-state snapshot is produced through `CanonicalBytes::new()`:
//!    sorted keys, compact separators, no floats.
//!
//! 2. **`HashHex` newtype.** A hash identity is exactly 64 lowercase hex
//!    characters. The constructor validates; there is no other way in.
//!
//! 3. **Explicit encodings.** Base58Check is the Bitcoin alphabet with one
//!    `'1'` per leading zero byte; base64url never pads on encode.
//!
//! 4. **`PhiAmount`.** Amounts are 18-decimal fixed-point big integers,
//!    never floats.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sigil-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod phi;

// Re-export primary types for ergonomic imports.
pub use canonical::{stable_stringify, CanonicalBytes};
pub use digest::{
    hash_canonical, hash_pair, hash_stable, hash_str, sha256_bytes, sha256_hex, HashHex,
};
pub use encoding::{
    base58_check, base58_encode, base64_decode, base64_encode, base64url_decode,
    base64url_encode, hex_decode, hex_encode, is_hex_of_len,
};
pub use error::{CanonicalizationError, EncodingError, SigilError};
pub use phi::PhiAmount;
