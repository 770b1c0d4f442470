//! # sdvc-cli — Selective-Disclosure Credential Tool
//!
//! Provides the `sdvc` command-line interface over the BBS+ suites.
//!
//! ## Subcommands
//!
//! - `sdvc keygen`: Generate or re-derive an issuer key pair.
//! - `sdvc issue`: Sign a credential with `BbsBlsSignature2020`.
//! - `sdvc derive`: Derive a `BbsBlsSignatureProof2020` from a signed
//!   credential and a reveal pattern.
//! - `sdvc verify`: Verify a signed or derived credential. Exits 0 when it
//!   verifies and 2 when it does not.
//!
//! Contexts and DID documents are never fetched. Pass them with
//! `--documents`, a JSON object mapping IRI to document:
//!
//! ```bash
//! sdvc keygen --out issuer-key.json
//! sdvc issue credential.json --key issuer-key.json \
//!     --verification-method did:example:issuer#key-1 --documents docs.json --out signed.json
//! sdvc derive signed.json --reveal reveal.json --documents docs.json --out derived.json
//! sdvc verify derived.json --documents docs.json
//! ```

pub mod credential;
pub mod documents;
pub mod keys;

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read and parse a JSON file.
pub fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write pretty JSON to `out`, or to stdout when `out` is `None`.
pub fn write_json(value: &Value, out: Option<&Path>) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => std::fs::write(path, format!("{text}\n"))
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
