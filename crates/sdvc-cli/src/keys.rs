//! # Keygen Subcommand
//!
//! Issuer key files are JSON with base58 key material:
//!
//! ```json
//! { "publicKeyBase58": "...", "secretKeyBase58": "..." }
//! ```
//!
//! With `--method-id`, a `Bls12381G2Key2020` verification method document
//! for the public key is written too, ready to drop into a `--documents`
//! map.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use sdvc_zkp::{KeyPair, ProofEngine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::write_json;

/// Arguments for `sdvc keygen`.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Re-derive the pair from an existing base58 secret key instead of
    /// generating a fresh one.
    #[arg(long)]
    pub secret: Option<String>,

    /// Write the key file here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Verification method IRI, e.g. `did:example:issuer#key-1`. Emits a
    /// method document for the new key.
    #[arg(long)]
    pub method_id: Option<String>,

    /// Where to write the method document. Defaults to stdout.
    #[arg(long, requires = "method_id")]
    pub method_out: Option<PathBuf>,
}

/// On-disk key pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFile {
    pub public_key_base58: String,
    pub secret_key_base58: String,
}

impl KeyFile {
    pub fn from_key_pair(key: &KeyPair) -> Self {
        Self {
            public_key_base58: key.public_key().to_base58(),
            secret_key_base58: key.secret_base58(),
        }
    }

    /// Rebuild the key pair, checking the stored public key matches.
    pub fn to_key_pair(&self, engine: &dyn ProofEngine) -> Result<KeyPair> {
        let key = key_pair_from_base58(&self.secret_key_base58, engine)?;
        anyhow::ensure!(
            key.public_key().to_base58() == self.public_key_base58,
            "public key in key file does not match its secret key"
        );
        Ok(key)
    }
}

/// A `Bls12381G2Key2020` method document. The controller is the IRI
/// before the fragment.
pub fn method_document(method_id: &str, key: &KeyPair) -> Value {
    let controller = method_id.split_once('#').map_or(method_id, |(base, _)| base);
    json!({
        "id": method_id,
        "type": "Bls12381G2Key2020",
        "controller": controller,
        "publicKeyBase58": key.public_key().to_base58()
    })
}

/// Read a key file.
pub fn load_key_pair(path: &Path, engine: &dyn ProofEngine) -> Result<KeyPair> {
    let value = crate::read_json(path)?;
    let file: KeyFile = serde_json::from_value(value)
        .with_context(|| format!("{} is not a key file", path.display()))?;
    file.to_key_pair(engine)
}

fn key_pair_from_base58(secret: &str, engine: &dyn ProofEngine) -> Result<KeyPair> {
    let bytes = bs58::decode(secret)
        .into_vec()
        .context("secret key is not base58")?;
    Ok(engine.key_pair_from_secret(&bytes)?)
}

/// Execute `sdvc keygen`.
pub fn run_keygen(args: &KeygenArgs, engine: &dyn ProofEngine) -> Result<u8> {
    let key = match &args.secret {
        Some(secret) => key_pair_from_base58(secret, engine)?,
        None => engine.generate_key_pair()?,
    };
    tracing::info!(engine = engine.name(), "key pair ready");
    let file = KeyFile::from_key_pair(&key);
    write_json(&serde_json::to_value(&file)?, args.out.as_deref())?;
    if let Some(method_id) = &args.method_id {
        write_json(&method_document(method_id, &key), args.method_out.as_deref())?;
    }
    Ok(0)
}
