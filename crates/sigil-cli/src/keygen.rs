//! # Keygen Subcommand
//!
//! Loads the device keypair from its store, creating and persisting one on
//! first use. Falls back to an ephemeral keypair when the store is
//! unusable, and says so.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use sigil_crypto::{FileKeyStore, KeyManager, KeypairSource};

/// Environment variable naming the key store file.
pub const ENV_KEYSTORE_PATH: &str = "SIGIL_KEYSTORE_PATH";

const DEFAULT_KEYSTORE_PATH: &str = ".sigil/keypair.json";

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key store file. Defaults to $SIGIL_KEYSTORE_PATH, then
    /// `.sigil/keypair.json`.
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeygenOutput {
    public_key: String,
    identity_key: Option<String>,
    source: String,
    store: String,
}

pub fn resolve_store_path(explicit: Option<&PathBuf>) -> PathBuf {
    explicit
        .cloned()
        .or_else(|| std::env::var_os(ENV_KEYSTORE_PATH).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KEYSTORE_PATH))
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let path = resolve_store_path(args.store.as_ref());
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "could not create key store directory");
        }
    }

    let manager = KeyManager::new(Box::new(FileKeyStore::new(&path)));
    let loaded = manager.load_or_create();
    let identity_key = match loaded.keypair.identity_key() {
        Ok(k) => Some(k),
        Err(e) => {
            tracing::warn!(error = %e, "identity key could not be derived");
            None
        }
    };

    let out = KeygenOutput {
        public_key: loaded.keypair.public_key_b64u().to_string(),
        identity_key,
        source: loaded.source.to_string(),
        store: path.display().to_string(),
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("public key:   {}", out.public_key);
        println!("identity key: {}", out.identity_key.as_deref().unwrap_or("-"));
        println!("source:       {} ({})", out.source, out.store);
    }
    if loaded.source == KeypairSource::Ephemeral {
        eprintln!("warning: key store unavailable; this keypair will not persist");
    }
    Ok(0)
}
