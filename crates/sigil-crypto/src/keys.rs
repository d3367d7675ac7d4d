//! # Key Manager — ECDSA P-256 Keypairs with Pluggable Persistence
//!
//! Signing keys are ECDSA over P-256 with SHA-256. Encodings match what a
//! WebCrypto client exports, so keys and signatures move freely between the
//! browser and this crate:
//!
//! - public key: base64url (no padding) of the SPKI DER encoding,
//! - private key: base64url of the PKCS#8 DER encoding,
//! - signature: base64url of the 64-byte IEEE P1363 `r ‖ s` form.
//!
//! ## Persistence
//!
//! Where the pair lives is a [`KeyStore`] capability handed to
//! [`KeyManager::new`]. Three stores ship here:
//!
//! - [`FileKeyStore`]: a JSON file, replaced with write-then-rename so two
//!   racing first-use writers leave one complete pair on disk.
//! - [`MemoryKeyStore`]: process-local, for tests and embedding.
//! - [`UnavailableKeyStore`]: always fails; models disabled storage.
//!
//! ## Security Invariants
//!
//! - `Keypair` does not implement `Serialize`; its `Debug` redacts the
//!   private half.
//! - [`verify`] never errors. Malformed keys or signatures verify as `false`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use serde::{Deserialize, Serialize};
use sigil_core::{base58_check, base64url_decode, base64url_encode, sha256_bytes};

use crate::error::{CryptoError, KeyStoreError};

/// Version byte for Base58Check identity keys.
pub const IDENTITY_KEY_VERSION: u8 = 0x00;

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An ECDSA P-256 signing keypair.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    public_key_b64u: String,
}

impl Keypair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let verifying_key = VerifyingKey::from(&signing_key);
        // SPKI export of a freshly generated point cannot fail for P-256.
        let public_key_b64u = verifying_key
            .to_public_key_der()
            .map(|doc| base64url_encode(doc.as_bytes()))
            .unwrap_or_default();
        Self {
            signing_key,
            verifying_key,
            public_key_b64u,
        }
    }

    /// Import a persisted pair.
    ///
    /// The stored SPKI string is kept verbatim as the public key encoding.
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidKey` if either half fails to decode or the two
    /// halves do not belong together.
    pub fn from_stored(stored: &StoredKeypair) -> Result<Self, CryptoError> {
        let pkcs8 = base64url_decode(&stored.pkcs8)?;
        let spki = base64url_decode(&stored.spki)?;
        let signing_key = SigningKey::from_pkcs8_der(&pkcs8)
            .map_err(|e| CryptoError::InvalidKey(format!("pkcs8: {e}")))?;
        let verifying_key = VerifyingKey::from_public_key_der(&spki)
            .map_err(|e| CryptoError::InvalidKey(format!("spki: {e}")))?;
        if signing_key.verifying_key() != &verifying_key {
            return Err(CryptoError::InvalidKey(
                "public key does not match private key".into(),
            ));
        }
        Ok(Self {
            signing_key,
            verifying_key,
            public_key_b64u: stored.spki.clone(),
        })
    }

    /// Export both halves for persistence.
    pub fn to_stored(&self) -> Result<StoredKeypair, CryptoError> {
        let pkcs8 = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| CryptoError::Export(e.to_string()))?;
        Ok(StoredKeypair {
            pkcs8: base64url_encode(pkcs8.as_bytes()),
            spki: self.public_key_b64u.clone(),
        })
    }

    /// base64url SPKI of the public key.
    pub fn public_key_b64u(&self) -> &str {
        &self.public_key_b64u
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Sign `message` with ECDSA-SHA256; returns base64url of `r ‖ s`.
    pub fn sign(&self, message: &[u8]) -> String {
        let sig: Signature = self.signing_key.sign(message);
        base64url_encode(sig.to_bytes())
    }

    /// Base58Check identity key of this keypair's public key.
    pub fn identity_key(&self) -> Result<String, CryptoError> {
        identity_key_from_public_key(&self.public_key_b64u)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.public_key_b64u.chars().count();
        let tail: String = self.public_key_b64u.chars().skip(n.saturating_sub(12)).collect();
        f.debug_struct("Keypair")
            .field("public_key", &format_args!("...{tail}"))
            .field("private_key", &format_args!("<redacted>"))
            .finish()
    }
}

/// Verify a base64url P1363 signature under a base64url SPKI public key.
///
/// Any decode failure is a `false`, never an error.
pub fn verify(public_key_b64u: &str, message: &[u8], signature_b64u: &str) -> bool {
    let Ok(spki) = base64url_decode(public_key_b64u) else {
        return false;
    };
    let Ok(sig_bytes) = base64url_decode(signature_b64u) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_public_key_der(&spki) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    key.verify(message, &sig).is_ok()
}

/// Identity key bound to a public key: SPKI → SHA-256 → first 20 bytes →
/// Base58Check with version `0x00`.
pub fn identity_key_from_public_key(spki_b64u: &str) -> Result<String, CryptoError> {
    let spki = base64url_decode(spki_b64u)?;
    let digest = sha256_bytes(&spki);
    Ok(base58_check(&digest[..20], IDENTITY_KEY_VERSION))
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// The persisted form of a keypair: both halves as base64url DER.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeypair {
    #[serde(rename = "kairos:key:pkcs8", default)]
    pub pkcs8: String,
    #[serde(rename = "kairos:key:spki", default)]
    pub spki: String,
}

impl StoredKeypair {
    /// Both halves present.
    pub fn is_complete(&self) -> bool {
        !self.pkcs8.is_empty() && !self.spki.is_empty()
    }
}

impl fmt::Debug for StoredKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKeypair")
            .field("pkcs8", &"<redacted>")
            .field("spki", &self.spki)
            .finish()
    }
}

/// A place to keep one keypair.
///
/// Implementations must be `Send + Sync`; the store is process-wide state.
pub trait KeyStore: Send + Sync {
    /// Return the stored pair, or `None` when nothing (or only half a pair)
    /// has been stored.
    fn load(&self) -> Result<Option<StoredKeypair>, KeyStoreError>;

    /// Persist `pair`, replacing whatever was there.
    fn save(&self, pair: &StoredKeypair) -> Result<(), KeyStoreError>;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;
}

// ─── FileKeyStore ────────────────────────────────────────────────────────

/// Keypair persisted as a small JSON file.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keypair".into());
        let tmp_name = format!(".{file_name}.{:016x}.tmp", rand::random::<u64>());
        match self.path.parent() {
            Some(dir) => dir.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<StoredKeypair>, KeyStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredKeypair = serde_json::from_str(&text)?;
        Ok(stored.is_complete().then_some(stored))
    }

    fn save(&self, pair: &StoredKeypair) -> Result<(), KeyStoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(pair)?)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "FileKeyStore"
    }
}

// ─── MemoryKeyStore ──────────────────────────────────────────────────────

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    slot: Mutex<Option<StoredKeypair>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<StoredKeypair>, KeyStoreError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| KeyStoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(slot.clone().filter(StoredKeypair::is_complete))
    }

    fn save(&self, pair: &StoredKeypair) -> Result<(), KeyStoreError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| KeyStoreError::Unavailable("memory store lock poisoned".into()))?;
        *slot = Some(pair.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "MemoryKeyStore"
    }
}

// ─── UnavailableKeyStore ─────────────────────────────────────────────────

/// A store that refuses every operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableKeyStore;

impl KeyStore for UnavailableKeyStore {
    fn load(&self) -> Result<Option<StoredKeypair>, KeyStoreError> {
        Err(KeyStoreError::Unavailable("persistence disabled".into()))
    }

    fn save(&self, _pair: &StoredKeypair) -> Result<(), KeyStoreError> {
        Err(KeyStoreError::Unavailable("persistence disabled".into()))
    }

    fn name(&self) -> &str {
        "UnavailableKeyStore"
    }
}

// ---------------------------------------------------------------------------
// KeyManager
// ---------------------------------------------------------------------------

/// Where a loaded keypair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypairSource {
    /// Imported from the store.
    Persisted,
    /// Generated now and saved to the store.
    Created,
    /// Generated now; the store could not be used.
    Ephemeral,
}

impl fmt::Display for KeypairSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Persisted => "persisted",
            Self::Created => "created",
            Self::Ephemeral => "ephemeral",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct LoadedKeypair {
    pub keypair: Keypair,
    pub source: KeypairSource,
}

/// Loads the device keypair from a store, creating it on first use.
pub struct KeyManager {
    store: Box<dyn KeyStore>,
}

impl KeyManager {
    pub fn new(store: Box<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Import the persisted pair, or generate and persist a new one.
    ///
    /// Never fails. Any store or import error degrades to an ephemeral
    /// keypair that is not persisted.
    pub fn load_or_create(&self) -> LoadedKeypair {
        let store = self.store.name();
        match self.store.load() {
            Ok(Some(stored)) => match Keypair::from_stored(&stored) {
                Ok(keypair) => {
                    tracing::debug!(store, "loaded persisted keypair");
                    LoadedKeypair {
                        keypair,
                        source: KeypairSource::Persisted,
                    }
                }
                Err(e) => {
                    tracing::warn!(store, error = %e, "persisted keypair unusable; using ephemeral keys");
                    Self::ephemeral()
                }
            },
            Ok(None) => {
                let keypair = Keypair::generate();
                let saved = keypair
                    .to_stored()
                    .map_err(|e| e.to_string())
                    .and_then(|s| self.store.save(&s).map_err(|e| e.to_string()));
                match saved {
                    Ok(()) => {
                        tracing::info!(store, "created and persisted new keypair");
                        LoadedKeypair {
                            keypair,
                            source: KeypairSource::Created,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(store, %error, "could not persist keypair; using ephemeral keys");
                        LoadedKeypair {
                            keypair,
                            source: KeypairSource::Ephemeral,
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(store, error = %e, "key store unavailable; using ephemeral keys");
                Self::ephemeral()
            }
        }
    }

    fn ephemeral() -> LoadedKeypair {
        LoadedKeypair {
            keypair: Keypair::generate(),
            source: KeypairSource::Ephemeral,
        }
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager")
            .field("store", &self.store.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"hello sigil");
        assert!(verify(kp.public_key_b64u(), b"hello sigil", &sig));
    }

    #[test]
    fn signature_is_p1363_sized() {
        let kp = Keypair::generate();
        let sig = base64url_decode(&kp.sign(b"m")).unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn message_byte_flip_fails() {
        let kp = Keypair::generate();
        let msg = b"transfer #1".to_vec();
        let sig = kp.sign(&msg);
        for i in 0..msg.len() {
            let mut tampered = msg.clone();
            tampered[i] ^= 0x01;
            assert!(!verify(kp.public_key_b64u(), &tampered, &sig));
        }
    }

    #[test]
    fn signature_byte_flip_fails() {
        let kp = Keypair::generate();
        let sig = base64url_decode(&kp.sign(b"m")).unwrap();
        for i in [0, 31, 32, 63] {
            let mut bad = sig.clone();
            bad[i] ^= 0x80;
            assert!(!verify(kp.public_key_b64u(), b"m", &base64url_encode(&bad)));
        }
    }

    #[test]
    fn wrong_key_fails() {
        let a = Keypair::generate();
        let b = Keypair::generate();
        let sig = a.sign(b"m");
        assert!(!verify(b.public_key_b64u(), b"m", &sig));
    }

    #[test]
    fn malformed_inputs_are_false_not_errors() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"m");
        assert!(!verify("not base64 !!", b"m", &sig));
        assert!(!verify(kp.public_key_b64u(), b"m", "AAAA"));
        assert!(!verify("", b"m", ""));
    }

    #[test]
    fn stored_round_trip_keeps_identity() {
        let kp = Keypair::generate();
        let stored = kp.to_stored().unwrap();
        let back = Keypair::from_stored(&stored).unwrap();
        assert_eq!(back.public_key_b64u(), kp.public_key_b64u());
        let sig = back.sign(b"x");
        assert!(verify(kp.public_key_b64u(), b"x", &sig));
    }

    #[test]
    fn mismatched_halves_rejected() {
        let a = Keypair::generate().to_stored().unwrap();
        let b = Keypair::generate().to_stored().unwrap();
        let mixed = StoredKeypair {
            pkcs8: a.pkcs8,
            spki: b.spki,
        };
        assert!(matches!(
            Keypair::from_stored(&mixed),
            Err(CryptoError::InvalidKey(_))
        ));
    }

    #[test]
    fn debug_redacts_private_material() {
        let kp = Keypair::generate();
        let stored = kp.to_stored().unwrap();
        assert!(format!("{kp:?}").contains("<redacted>"));
        let dbg = format!("{stored:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains(&stored.pkcs8));
    }

    #[test]
    fn identity_key_is_base58check_of_spki_digest() {
        let kp = Keypair::generate();
        let spki = base64url_decode(kp.public_key_b64u()).unwrap();
        let d = sha256_bytes(&spki);
        assert_eq!(kp.identity_key().unwrap(), base58_check(&d[..20], 0));
        assert!(kp.identity_key().unwrap().starts_with('1'));
    }

    #[test]
    fn manager_creates_then_loads() {
        let manager = KeyManager::new(Box::new(MemoryKeyStore::new()));
        let first = manager.load_or_create();
        assert_eq!(first.source, KeypairSource::Created);
        let second = manager.load_or_create();
        assert_eq!(second.source, KeypairSource::Persisted);
        assert_eq!(
            first.keypair.public_key_b64u(),
            second.keypair.public_key_b64u()
        );
    }

    #[test]
    fn manager_degrades_to_ephemeral() {
        let manager = KeyManager::new(Box::new(UnavailableKeyStore));
        let a = manager.load_or_create();
        let b = manager.load_or_create();
        assert_eq!(a.source, KeypairSource::Ephemeral);
        assert_ne!(a.keypair.public_key_b64u(), b.keypair.public_key_b64u());
    }

    #[test]
    fn manager_ephemeral_on_corrupt_record() {
        let store = MemoryKeyStore::new();
        store
            .save(&StoredKeypair {
                pkcs8: "AAAA".into(),
                spki: "AAAA".into(),
            })
            .unwrap();
        let manager = KeyManager::new(Box::new(store));
        assert_eq!(manager.load_or_create().source, KeypairSource::Ephemeral);
    }

    #[test]
    fn half_pair_counts_as_empty() {
        let store = MemoryKeyStore::new();
        store
            .save(&StoredKeypair {
                pkcs8: String::new(),
                spki: "abc".into(),
            })
            .unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_persists_across_managers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("device.json");
        let first = KeyManager::new(Box::new(FileKeyStore::new(&path))).load_or_create();
        assert_eq!(first.source, KeypairSource::Created);
        assert!(path.exists());

        let second = KeyManager::new(Box::new(FileKeyStore::new(&path))).load_or_create();
        assert_eq!(second.source, KeypairSource::Persisted);
        assert_eq!(
            first.keypair.public_key_b64u(),
            second.keypair.public_key_b64u()
        );
    }

    #[test]
    fn file_store_uses_original_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("k.json"));
        let pair = Keypair::generate().to_stored().unwrap();
        store.save(&pair).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["kairos:key:spki"], pair.spki.as_str());
        assert!(raw.get("kairos:key:pkcs8").is_some());
    }

    #[test]
    fn file_store_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("absent.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn file_store_garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.json");
        fs::write(&path, "not json").unwrap();
        let store = FileKeyStore::new(&path);
        assert!(matches!(store.load(), Err(KeyStoreError::Corrupt(_))));
        let manager = KeyManager::new(Box::new(store));
        assert_eq!(manager.load_or_create().source, KeypairSource::Ephemeral);
    }
}
