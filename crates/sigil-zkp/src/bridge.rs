//! # ZK Bridge — Best-Effort Proof Verification
//!
//! The proving backend is optional. A [`ZkBridge`] is built once at startup
//! from whatever [`ProofVerifier`] the host registered, or from nothing, and
//! answers every verification request with a [`ZkResult`]:
//!
//! - `Verified(true)` / `Verified(false)`: the backend ran (or the inputs
//!   were malformed, which is a `false`),
//! - `Unavailable`: no backend. Logged once per bridge, not per call.
//!
//! `try_verify` never returns an error. Backend failures are logged and
//! reported as `Verified(false)`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;

use crate::bundle::SCHEME_GROTH16;
use crate::traits::ProofVerifier;

/// Outcome of a best-effort verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZkResult {
    Verified(bool),
    Unavailable,
}

impl ZkResult {
    /// `Some(bool)` when a backend answered, `None` when unavailable.
    pub fn as_option(self) -> Option<bool> {
        match self {
            Self::Verified(ok) => Some(ok),
            Self::Unavailable => None,
        }
    }

    pub fn is_verified(self) -> bool {
        self == Self::Verified(true)
    }
}

/// Inputs to [`ZkBridge::try_verify`]. `vkey` beats `fallback_vkey`.
#[derive(Debug, Clone, Copy)]
pub struct ZkVerifyRequest<'a> {
    pub proof: &'a Value,
    pub public_signals: &'a Value,
    pub vkey: Option<&'a Value>,
    pub fallback_vkey: Option<&'a Value>,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Verifiers the host has made available, keyed by proof scheme.
#[derive(Default, Clone)]
pub struct ProofVerifierRegistry {
    verifiers: BTreeMap<String, Arc<dyn ProofVerifier>>,
}

impl ProofVerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `verifier` for `scheme`, replacing any earlier entry.
    pub fn register(&mut self, scheme: impl Into<String>, verifier: Arc<dyn ProofVerifier>) {
        self.verifiers.insert(scheme.into(), verifier);
    }

    pub fn get(&self, scheme: &str) -> Option<Arc<dyn ProofVerifier>> {
        self.verifiers.get(scheme).cloned()
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.verifiers.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

impl fmt::Debug for ProofVerifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.schemes()).finish()
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

pub struct ZkBridge {
    verifier: Option<Arc<dyn ProofVerifier>>,
    logged_unavailable: AtomicBool,
}

impl ZkBridge {
    /// A bridge with no backend.
    pub fn unavailable() -> Self {
        Self {
            verifier: None,
            logged_unavailable: AtomicBool::new(false),
        }
    }

    pub fn with_verifier(verifier: Arc<dyn ProofVerifier>) -> Self {
        Self {
            verifier: Some(verifier),
            logged_unavailable: AtomicBool::new(false),
        }
    }

    /// Use the registry's Groth16 verifier, if one was registered.
    pub fn from_registry(registry: &ProofVerifierRegistry) -> Self {
        match registry.get(SCHEME_GROTH16) {
            Some(v) => {
                tracing::debug!(backend = v.backend(), "zk verifier registered");
                Self::with_verifier(v)
            }
            None => Self::unavailable(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.verifier.is_some()
    }

    /// Verify one proof, best effort.
    pub fn try_verify(&self, req: ZkVerifyRequest<'_>) -> ZkResult {
        let Some(verifier) = &self.verifier else {
            if !self.logged_unavailable.swap(true, Ordering::Relaxed) {
                tracing::info!("no zk verifier registered; proofs reported as unverified");
            }
            return ZkResult::Unavailable;
        };

        let Some(vkey) = req.vkey.or(req.fallback_vkey) else {
            return ZkResult::Verified(false);
        };
        if !vkey.is_object() || !req.proof.is_object() || !is_public_signals(req.public_signals) {
            return ZkResult::Verified(false);
        }

        match verifier.verify(vkey, req.public_signals, req.proof) {
            Ok(ok) => ZkResult::Verified(ok),
            Err(e) => {
                tracing::warn!(backend = verifier.backend(), error = %e, "zk verification errored");
                ZkResult::Verified(false)
            }
        }
    }
}

impl Default for ZkBridge {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl fmt::Debug for ZkBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkBridge")
            .field("backend", &self.verifier.as_ref().map(|v| v.backend()))
            .finish()
    }
}

/// An array of scalars or an object whose values are all scalars.
fn is_public_signals(v: &Value) -> bool {
    let is_scalar = |x: &Value| x.is_string() || x.is_number();
    match v {
        Value::Array(items) => items.iter().all(is_scalar),
        Value::Object(map) => map.values().all(is_scalar),
        _ => false,
    }
}
