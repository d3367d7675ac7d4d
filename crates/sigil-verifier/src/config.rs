//! Verification configuration.
//!
//! Explicit values passed to the verifier at construction. `from_env`
//! exists for binaries; libraries and tests build the struct directly.

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Entries processed between cooperative yields.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Path to a JSON verifying key used when a head carries none inline.
pub const ENV_VKEY_PATH: &str = "SIGIL_ZK_VKEY_PATH";

/// Positive integer overriding [`DEFAULT_BATCH_SIZE`].
pub const ENV_BATCH_SIZE: &str = "SIGIL_VERIFY_BATCH";

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationConfig {
    /// Fallback Groth16 verifying key. A head's inline `zkVerifyingKey`
    /// takes precedence.
    pub fallback_vkey: Option<Value>,
    pub batch_size: usize,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            fallback_vkey: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl VerificationConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SIGIL_ZK_VKEY_PATH` (optional): JSON file holding the fallback key
    /// - `SIGIL_VERIFY_BATCH` (default: 8)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let fallback_vkey = match lookup(ENV_VKEY_PATH).filter(|p| !p.trim().is_empty()) {
            Some(path) => Some(load_vkey(Path::new(path.trim()))?),
            None => None,
        };
        let batch_size = match lookup(ENV_BATCH_SIZE) {
            Some(raw) => parse_batch_size(&raw)?,
            None => DEFAULT_BATCH_SIZE,
        };
        Ok(Self {
            fallback_vkey,
            batch_size,
        })
    }

    pub fn with_fallback_vkey(mut self, vkey: Value) -> Self {
        self.fallback_vkey = Some(vkey);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Read a verifying key from a JSON file. The key must be a JSON object.
pub fn load_vkey(path: &Path) -> Result<Value, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::VkeyRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::VkeyParse {
        path: path.to_path_buf(),
        source,
    })?;
    if !value.is_object() {
        return Err(ConfigError::VkeyNotObject(path.to_path_buf()));
    }
    Ok(value)
}

fn parse_batch_size(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidBatchSize(raw.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read verifying key {}: {source}", path.display())]
    VkeyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("verifying key {} is not valid JSON: {source}", path.display())]
    VkeyParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("verifying key {} must be a JSON object", .0.display())]
    VkeyNotObject(PathBuf),
    #[error("SIGIL_VERIFY_BATCH must be a positive integer, got {0:?}")]
    InvalidBatchSize(String),
}
