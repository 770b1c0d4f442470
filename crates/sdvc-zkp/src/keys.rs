//! # Key Material
//!
//! Opaque key bytes for a proof engine. The byte layout of a public key is
//! engine-specific; this module only carries the bytes and their base58
//! transport encoding (`publicKeyBase58` in verification method documents).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::traits::EngineError;

/// An issuer public key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base58 public key.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MalformedInput` for invalid base58 or an empty key.
    pub fn from_base58(encoded: &str) -> Result<Self, EngineError> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| EngineError::MalformedInput(format!("publicKeyBase58: {e}")))?;
        if bytes.is_empty() {
            return Err(EngineError::MalformedInput("publicKeyBase58 is empty".to_string()));
        }
        Ok(Self(bytes))
    }

    /// Base58 encoding of the key bytes.
    pub fn to_base58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_base58())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_base58()
    }
}

impl TryFrom<String> for PublicKey {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PublicKey::from_base58(&value)
    }
}

/// A signing key pair. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct KeyPair {
    secret: Vec<u8>,
    public: PublicKey,
}

impl KeyPair {
    /// Assemble a key pair. Engines derive `public` from `secret`; use
    /// [`ProofEngine::key_pair_from_secret`](crate::ProofEngine::key_pair_from_secret)
    /// rather than calling this with unrelated halves.
    pub fn new(secret: Vec<u8>, public: PublicKey) -> Self {
        Self { secret, public }
    }

    /// The public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Raw secret key bytes.
    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }

    /// Base58 encoding of the secret key.
    pub fn secret_base58(&self) -> String {
        bs58::encode(&self.secret).into_string()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_roundtrip() {
        let key = PublicKey::from_bytes(vec![0u8, 1, 2, 250, 255]);
        let decoded = PublicKey::from_base58(&key.to_base58()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn invalid_base58_is_rejected() {
        assert!(PublicKey::from_base58("0OIl").is_err());
        assert!(PublicKey::from_base58("").is_err());
    }

    #[test]
    fn serde_uses_base58_string() {
        let key = PublicKey::from_bytes(vec![9u8; 4]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key.to_base58()));
        let back: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn debug_redacts_secret() {
        let pair = KeyPair::new(vec![42u8; 32], PublicKey::from_bytes(vec![1u8; 32]));
        let dbg = format!("{pair:?}");
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains(&pair.secret_base58()));
    }
}
