//! # Hash Identities — `HashHex` and SHA-256 helpers
//!
//! Every leaf, root, stamp and content id in a sigil document is a SHA-256
//! digest rendered as 64 lowercase hex characters. `HashHex` enforces that
//! shape at construction and at deserialization.
//!
//! Two hashing paths exist:
//!
//! - [`sha256_hex`] / [`hash_str`] hash raw bytes or a UTF-8 string. Used
//!   where the preimage format is fixed by the document (leaf projections,
//!   `a|b` pairs, segment files).
//! - [`hash_canonical`] hashes a structured value through
//!   [`CanonicalBytes`]. Used for head snapshots and ZK stamp inputs.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::{stable_stringify, CanonicalBytes};
use crate::error::{CanonicalizationError, EncodingError};

/// A SHA-256 digest as 64 lowercase hex characters.
///
/// Ordering is plain lexicographic string ordering, which is what the
/// Merkle engine's sort-before-hash rule relies on.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HashHex(String);

impl HashHex {
    /// Length of a hex-encoded SHA-256 digest.
    pub const LEN: usize = 64;

    /// Parse and normalize a hash. Accepts upper-case hex and lowercases it.
    pub fn parse(s: &str) -> Result<Self, EncodingError> {
        let t = s.trim();
        if t.len() != Self::LEN || !t.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(EncodingError::InvalidHash(s.to_string()));
        }
        Ok(Self(t.to_ascii_lowercase()))
    }

    /// The all-zero sentinel used for the root of an empty leaf set.
    pub fn zero() -> Self {
        Self("0".repeat(Self::LEN))
    }

    /// Wrap raw digest bytes.
    pub fn from_digest(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Borrow the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to the 32 raw digest bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Length and alphabet were validated at construction.
        if hex::decode_to_slice(&self.0, &mut out).is_err() {
            return [0u8; 32];
        }
        out
    }

    /// True for the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }
}

impl TryFrom<String> for HashHex {
    type Error = EncodingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HashHex> for String {
    fn from(h: HashHex) -> Self {
        h.0
    }
}

impl AsRef<str> for HashHex {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for HashHex {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<String> for HashHex {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

impl fmt::Display for HashHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for HashHex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashHex({}...)", &self.0[..8])
    }
}

/// Raw SHA-256 of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// SHA-256 of raw bytes, hex-encoded.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> HashHex {
    HashHex::from_digest(&sha256_bytes(data.as_ref()))
}

/// SHA-256 of the UTF-8 bytes of a string.
pub fn hash_str(s: &str) -> HashHex {
    sha256_hex(s.as_bytes())
}

/// Hash of the UTF-8 string `a + "|" + b`.
///
/// Not symmetric: callers that need order independence sort first.
pub fn hash_pair(a: &HashHex, b: &HashHex) -> HashHex {
    let mut joined = String::with_capacity(HashHex::LEN * 2 + 1);
    joined.push_str(a.as_str());
    joined.push('|');
    joined.push_str(b.as_str());
    hash_str(&joined)
}

/// Hash any serializable value through canonical bytes.
pub fn hash_canonical(value: &impl Serialize) -> Result<HashHex, CanonicalizationError> {
    let cb = CanonicalBytes::new(value)?;
    Ok(sha256_hex(cb.as_bytes()))
}

/// Hash any serializable value through [`stable_stringify`]. Unlike
/// [`hash_canonical`] this accepts non-integer numbers.
pub fn hash_stable(value: &impl Serialize) -> Result<HashHex, CanonicalizationError> {
    Ok(hash_str(&stable_stringify(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vectors() {
        assert_eq!(
            hash_str("").as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hash_str("{}").as_str(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn parse_rejects_bad_shapes() {
        assert!(HashHex::parse("abc").is_err());
        assert!(HashHex::parse(&"g".repeat(64)).is_err());
        assert!(HashHex::parse(&"a".repeat(63)).is_err());
        assert!(HashHex::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn parse_lowercases() {
        let h = HashHex::parse(&"AB".repeat(32)).unwrap();
        assert_eq!(h.as_str(), "ab".repeat(32));
    }

    #[test]
    fn stable_hash_accepts_floats() {
        let signals = serde_json::json!([1.5, 2]);
        assert_eq!(hash_stable(&signals).unwrap(), hash_str("[1.5,2]"));
        assert!(hash_canonical(&signals).is_err());
        assert_eq!(
            hash_stable(&serde_json::json!({"b": 1, "a": 2})).unwrap(),
            hash_str(r#"{"a":2,"b":1}"#)
        );
    }

    #[test]
    fn zero_sentinel() {
        let z = HashHex::zero();
        assert_eq!(z.as_str(), "0".repeat(64));
        assert!(z.is_zero());
    }

    #[test]
    fn hash_pair_is_order_sensitive() {
        let a = hash_str("a");
        let b = hash_str("b");
        assert_ne!(hash_pair(&a, &b), hash_pair(&b, &a));
        assert_eq!(hash_pair(&a, &b), hash_str(&format!("{a}|{b}")));
    }

    #[test]
    fn serde_validates() {
        let ok: Result<HashHex, _> = serde_json::from_str(&format!("\"{}\"", "0".repeat(64)));
        assert!(ok.is_ok());
        let bad: Result<HashHex, _> = serde_json::from_str("\"nothex\"");
        assert!(bad.is_err());
    }

    #[test]
    fn to_bytes_roundtrip() {
        let h = hash_str("sigil");
        assert_eq!(HashHex::from_digest(&h.to_bytes()), h);
    }

    #[test]
    fn canonical_hash_ignores_key_order() {
        let a = hash_canonical(&serde_json::json!({"x": 1, "y": [1, 2]})).unwrap();
        let b = hash_canonical(&serde_json::json!({"y": [1, 2], "x": 1})).unwrap();
        assert_eq!(a, b);
    }
}
