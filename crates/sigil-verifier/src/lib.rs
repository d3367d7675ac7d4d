//! # sigil-verifier — Offline Verification of Sigil Heads
//!
//! Checks a head document's hardened transfer chain without network access
//! or trusted state: head pinning, leaf binding, send and receive
//! signatures, ZK stamps and optional proof verification.
//!
//! ## Crate Policy
//!
//! - Never returns an error for a parsed head. Every finding is a string in
//!   [`VerifyReport::issues`] (or `advisories` for informational checks).
//! - Configuration is explicit ([`VerificationConfig`]); `from_env` is for
//!   binaries.
//! - The async entry point yields cooperatively; it does not spawn.

pub mod config;
pub mod verifier;

pub use config::{load_vkey, ConfigError, VerificationConfig, DEFAULT_BATCH_SIZE};
pub use verifier::{
    annotate_zk_verification, Entry, LeafStatus, OfflineVerifier, SideCheck, VerifyReport,
    ZkEntry,
};
