//! # sigil-crypto — Cryptographic Primitives
//!
//! Provides the cryptographic building blocks for the sigil ledger:
//!
//! - **ECDSA P-256** keypairs, signing and verification with WebCrypto
//!   compatible encodings (SPKI / PKCS#8 / P1363, all base64url).
//! - **Key persistence** behind the [`KeyStore`] trait, with
//!   [`KeyManager::load_or_create`] degrading to ephemeral keys instead of
//!   failing.
//! - **Identity keys**: Base58Check of the first 20 bytes of the SPKI digest.
//! - **Merkle engine** with sort-before-hash pairing and inclusion proofs.
//!
//! ## Crate Policy
//!
//! - Depends only on `sigil-core` internally.
//! - No mocking of cryptographic operations in tests; all tests use real
//!   P-256 keys and real SHA-256.
//! - No `unsafe` code.

pub mod error;
pub mod keys;
pub mod merkle;

pub use error::{CryptoError, KeyStoreError, MerkleError};
pub use keys::{
    identity_key_from_public_key, verify, FileKeyStore, KeyManager, KeyStore, Keypair,
    KeypairSource, LoadedKeypair, MemoryKeyStore, StoredKeypair, UnavailableKeyStore,
};
pub use merkle::{build_root, verify_proof, TransferProof};
