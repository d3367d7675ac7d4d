//! # Canonical Serialization — Deterministic Bytes for Hashing and Signing
//!
//! `CanonicalBytes` is the construction path for every byte sequence that is
//! signed (send/receive messages) or hashed as a structured snapshot (head
//! state). ZK stamp inputs carry prover output this crate does not shape,
//! so they go through [`stable_stringify`], which keeps the key ordering
//! and compact form but lets non-integer numbers through.
//!
//! ## Rules
//!
//! 1. **Sorted keys**: every object is emitted with its keys in sorted
//!    order, at every depth. Arrays keep their order.
//! 2. **Compact separators**: no whitespace between tokens.
//! 3. **No floats**: pulses and counters are integers, amounts are decimal
//!    strings. A non-integer number is rejected rather than serialized in a
//!    platform-dependent way.
//! 4. **Absent optionals are `null`**: `Option::None` serializes as `null`
//!    unless the field is explicitly skipped by its type.
//!
//! Serialization uses `serde_jcs` (RFC 8785), which produces the same bytes
//! as a sorted-key `JSON.stringify` for the integer/string/bool/null values
//! a sigil document carries.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by sorted-key canonical serialization.
///
/// # Invariants
///
/// - The only constructors are `CanonicalBytes::new()` and
///   `CanonicalBytes::from_value()`.
/// - Keys are sorted at every depth; separators are compact.
/// - No float values are present.
///
/// The inner `Vec<u8>` is private, so downstream code cannot produce a
/// `CanonicalBytes` that skipped the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// non-integer number, `CanonicalizationError::SerializationFailed` if
    /// serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-built JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let checked = reject_floats(value)?;
        let s = serde_jcs::to_string(&checked)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the canonical bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Sorted-key compact JSON of `obj`, floats allowed.
///
/// For commitments over third-party artefacts (proofs, public signals,
/// verifying keys) whose numbers this crate does not control. Numbers are
/// formatted the way ECMAScript `JSON.stringify` formats them. Never use
/// this for bytes that are signed.
pub fn stable_stringify(obj: &impl Serialize) -> Result<String, CanonicalizationError> {
    let value = serde_json::to_value(obj)?;
    Ok(serde_jcs::to_string(&value)?)
}

/// Walk a JSON tree and reject any number that is not an integer.
fn reject_floats(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(value)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k, reject_floats(v)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => {
            let out: Result<Vec<_>, _> = arr.into_iter().map(reject_floats).collect();
            Ok(Value::Array(out?))
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn json_value_no_floats() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| serde_json::json!(n)),
            "[a-zA-Z0-9_ ]{0,40}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,10}", inner, 0..8)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn deterministic(value in json_value_no_floats()) {
            let a = CanonicalBytes::from_value(value.clone()).unwrap();
            let b = CanonicalBytes::from_value(value).unwrap();
            prop_assert_eq!(a.as_bytes(), b.as_bytes());
        }

        #[test]
        fn output_is_valid_json(value in json_value_no_floats()) {
            let cb = CanonicalBytes::from_value(value.clone()).unwrap();
            let parsed: Value = serde_json::from_slice(cb.as_bytes()).unwrap();
            prop_assert_eq!(parsed, value);
        }
    }
}
