//! # Mock Proof Backend
//!
//! A deterministic, transparent stand-in for a Groth16 prover/verifier.
//! A "proof" is `{ "digest": H([vkey, publicSignals]) }` where `H` is the
//! sorted-key SHA-256 hash; verification recomputes the digest.
//!
//! ## Security Notice
//!
//! This backend provides NO zero-knowledge property and NO soundness: anyone
//! can compute a valid mock proof. It exists to exercise the bundle, stamp
//! and bridge plumbing in tests and development builds.

use serde_json::{json, Value};
use sigil_core::{hash_stable, HashHex};

use crate::traits::{
    ProofError, ProofProvider, ProofVerifier, ProvidedProof, ReceiveProofInput, SendProofInput,
    VerifyError,
};

/// Deterministic mock prover and verifier.
#[derive(Debug, Clone)]
pub struct MockProofBackend {
    vkey: Value,
}

impl Default for MockProofBackend {
    fn default() -> Self {
        Self {
            vkey: json!({
                "protocol": "groth16",
                "curve": "bls12381",
                "backend": "mock",
            }),
        }
    }
}

impl MockProofBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific verifying key; proofs are bound to it.
    pub fn with_vkey(vkey: Value) -> Self {
        Self { vkey }
    }

    pub fn vkey(&self) -> &Value {
        &self.vkey
    }

    fn digest(vkey: &Value, public_signals: &Value) -> Result<HashHex, VerifyError> {
        hash_stable(&json!([vkey, public_signals]))
            .map_err(|e| VerifyError::InvalidProof(e.to_string()))
    }

    fn prove(&self, public_signals: Value) -> Result<Option<ProvidedProof>, ProofError> {
        let digest = Self::digest(&self.vkey, &public_signals)
            .map_err(|e| ProofError::ProverError(e.to_string()))?;
        Ok(Some(ProvidedProof {
            proof: json!({ "digest": digest.as_str() }),
            public_signals,
            vkey: Some(self.vkey.clone()),
        }))
    }
}

impl ProofVerifier for MockProofBackend {
    fn verify(
        &self,
        vkey: &Value,
        public_signals: &Value,
        proof: &Value,
    ) -> Result<bool, VerifyError> {
        let expected = Self::digest(vkey, public_signals)?;
        Ok(proof.get("digest").and_then(Value::as_str) == Some(expected.as_str()))
    }

    fn backend(&self) -> &str {
        "mock"
    }
}

impl ProofProvider for MockProofBackend {
    fn provide_send_proof(
        &self,
        input: &SendProofInput,
    ) -> Result<Option<ProvidedProof>, ProofError> {
        self.prove(json!([
            input.leaf_hash,
            input.previous_head_root,
            input.nonce,
            input.sender_pulse.to_string(),
        ]))
    }

    fn provide_receive_proof(
        &self,
        input: &ReceiveProofInput,
    ) -> Result<Option<ProvidedProof>, ProofError> {
        self.prove(json!([
            input.leaf_hash,
            input.previous_head_root,
            input.link_sig,
        ]))
    }
}
