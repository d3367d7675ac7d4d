//! # Proof Backend Traits
//!
//! Two seams connect the ledger to an external proving system:
//!
//! - [`ProofVerifier`] checks a Groth16-style `(vkey, publicSignals, proof)`
//!   triple. The offline verifier reaches it through
//!   [`ZkBridge`](crate::bridge::ZkBridge).
//! - [`ProofProvider`] produces a proof for a send or receive event. The
//!   ledger calls it while hardening a transfer and attaches the result.
//!
//! ## Security Invariant
//!
//! Both traits require `Send + Sync`. Implementations must be pure with
//! respect to their inputs: the same triple verifies the same way every
//! time.

use serde_json::Value;
use thiserror::Error;

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The prover has no key or circuit loaded.
    #[error("prover unavailable: {0}")]
    Unavailable(String),
    /// Witness generation failed.
    #[error("witness error: {0}")]
    WitnessError(String),
    /// Internal prover error.
    #[error("prover error: {0}")]
    ProverError(String),
}

/// Error during proof verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof is structurally invalid.
    #[error("invalid proof: {0}")]
    InvalidProof(String),
    /// The verifying key is incompatible.
    #[error("key mismatch: {0}")]
    KeyMismatch(String),
    /// The backend failed internally.
    #[error("backend error: {0}")]
    Backend(String),
}

/// A proof verification backend.
pub trait ProofVerifier: Send + Sync {
    /// Verify `proof` for `public_signals` under `vkey`.
    fn verify(&self, vkey: &Value, public_signals: &Value, proof: &Value)
        -> Result<bool, VerifyError>;

    /// Backend name for diagnostics.
    fn backend(&self) -> &str;
}

/// What a prover is told about a send event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendProofInput {
    pub leaf_hash: String,
    pub previous_head_root: String,
    pub nonce: String,
    pub sender_pulse: u64,
}

/// What a prover is told about a receive event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveProofInput {
    pub leaf_hash: String,
    pub previous_head_root: String,
    /// The sender signature the receive links to.
    pub link_sig: String,
}

/// A proof as returned by a provider, before it is wrapped in a bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidedProof {
    pub proof: Value,
    pub public_signals: Value,
    pub vkey: Option<Value>,
}

/// Optional hook that attaches proofs to hardened transfers.
///
/// `Ok(None)` means "no proof for this event" and is not an error.
pub trait ProofProvider: Send + Sync {
    fn provide_send_proof(&self, input: &SendProofInput)
        -> Result<Option<ProvidedProof>, ProofError>;

    fn provide_receive_proof(
        &self,
        input: &ReceiveProofInput,
    ) -> Result<Option<ProvidedProof>, ProofError>;
}
