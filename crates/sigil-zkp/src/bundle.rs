//! # Bundles and Stamps
//!
//! A [`ZkBundle`] carries the proof material itself. A [`ZkStamp`] is the
//! compact commitment stored next to it: sorted-key hashes of the public
//! signals, the proof and the verifying key. The offline verifier recomputes
//! the hashes from the bundle and compares them with the stamp, so swapping
//! any part of a bundle after the fact is detected even when no proving
//! backend is present.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigil_core::{hash_stable, CanonicalizationError};

use crate::traits::ProvidedProof;

/// The only proof scheme a stamp may name.
pub const SCHEME_GROTH16: &str = "groth16";

/// The only curve a stamp may name, when it names one.
pub const CURVE_BLS12_381: &str = "BLS12-381";

/// Proof material attached to a hardened transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkBundle {
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    #[serde(default)]
    pub proof: Value,
    #[serde(default)]
    pub public_signals: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vkey: Option<Value>,
}

impl ZkBundle {
    /// Wrap a provider's output as a Groth16 / BLS12-381 bundle.
    pub fn groth16(provided: ProvidedProof) -> Self {
        Self {
            scheme: SCHEME_GROTH16.to_string(),
            curve: Some(CURVE_BLS12_381.to_string()),
            proof: provided.proof,
            public_signals: provided.public_signals,
            vkey: provided.vkey,
        }
    }

    /// The bundle's own key, else the fallback.
    pub fn effective_vkey<'a>(&'a self, fallback: Option<&'a Value>) -> Option<&'a Value> {
        self.vkey.as_ref().or(fallback)
    }
}

/// Hash commitment to a [`ZkBundle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkStamp {
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vkey_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl ZkStamp {
    /// Compute the stamp for `bundle`. `vkeyHash` is present only when a key
    /// is available from the bundle or `fallback_vkey`.
    pub fn for_bundle(
        bundle: &ZkBundle,
        fallback_vkey: Option<&Value>,
    ) -> Result<Self, CanonicalizationError> {
        let vkey_hash = match bundle.effective_vkey(fallback_vkey) {
            Some(vk) => Some(hash_stable(vk)?.to_string()),
            None => None,
        };
        Ok(Self {
            scheme: SCHEME_GROTH16.to_string(),
            curve: Some(CURVE_BLS12_381.to_string()),
            public_hash: Some(hash_stable(&bundle.public_signals)?.to_string()),
            proof_hash: Some(hash_stable(&bundle.proof)?.to_string()),
            vkey_hash,
            verified: None,
        })
    }

    /// Check this stamp against the bundle it claims to commit to.
    ///
    /// The scheme must be Groth16, a named curve must be BLS12-381, the
    /// public and proof hashes must be present and match, and a recorded key
    /// hash must match the effective key. Non-integer numbers in the bundle are
    /// hashed as written, so a stamp over fractional signals still matches.
    pub fn matches_bundle(&self, bundle: &ZkBundle, fallback_vkey: Option<&Value>) -> bool {
        if self.scheme != SCHEME_GROTH16 {
            return false;
        }
        if self.curve.as_deref().is_some_and(|c| c != CURVE_BLS12_381) {
            return false;
        }
        let (Ok(public_hash), Ok(proof_hash)) = (
            hash_stable(&bundle.public_signals),
            hash_stable(&bundle.proof),
        ) else {
            return false;
        };
        if self.public_hash.as_deref() != Some(public_hash.as_str())
            || self.proof_hash.as_deref() != Some(proof_hash.as_str())
        {
            return false;
        }
        match &self.vkey_hash {
            None => true,
            Some(expected) => match bundle.effective_vkey(fallback_vkey) {
                Some(vk) => hash_stable(vk).is_ok_and(|h| h.as_str() == expected),
                None => false,
            },
        }
    }
}
