//! # sigil-zkp — Optional Zero-Knowledge Proof Bridge
//!
//! Hardened transfers may carry a Groth16 proof. This crate defines how
//! those proofs are committed to, produced and checked, without tying the
//! ledger to any particular proving library.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ProofVerifier` checks proofs,
//!   `ProofProvider` produces them for send/receive events.
//!
//! - **Bundles** (`bundle.rs`): `ZkBundle` holds proof material;
//!   `ZkStamp` holds sorted-key hashes of it so tampering is detectable
//!   even when no backend is present.
//!
//! - **Bridge** (`bridge.rs`): `ZkBridge` wraps an optional registered
//!   verifier and answers `Verified(bool)` or `Unavailable`, never an error.
//!
//! - **Mock** (`mock.rs`, feature `mock`): deterministic transparent
//!   backend implementing both traits.
//!
//! ## Crate Policy
//!
//! - Depends only on `sigil-core` internally.
//! - Real proving backends plug in through `ProofVerifierRegistry`; none
//!   is linked here.

pub mod bridge;
pub mod bundle;
#[cfg(feature = "mock")]
pub mod mock;
pub mod traits;

pub use bridge::{ProofVerifierRegistry, ZkBridge, ZkResult, ZkVerifyRequest};
pub use bundle::{ZkBundle, ZkStamp, CURVE_BLS12_381, SCHEME_GROTH16};
#[cfg(feature = "mock")]
pub use mock::MockProofBackend;
pub use traits::{
    ProofError, ProofProvider, ProofVerifier, ProvidedProof, ReceiveProofInput, SendProofInput,
    VerifyError,
};
