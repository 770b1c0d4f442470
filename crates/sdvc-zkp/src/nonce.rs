//! # Proof Nonces
//!
//! A nonce binds one derived proof instance. It is generated from the OS
//! CSPRNG and carried base64-encoded in the derived proof. Derivations that
//! must stay unlinkable must never share a nonce.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::traits::EngineError;

/// Default nonce length in bytes.
pub const DEFAULT_NONCE_LEN: usize = 50;

/// Random bytes bound into proof creation and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(Vec<u8>);

impl Nonce {
    /// Draw `len` bytes from the OS CSPRNG.
    pub fn generate(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap caller-supplied bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a base64 nonce.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MalformedInput` for invalid base64.
    pub fn from_base64(encoded: &str) -> Result<Self, EngineError> {
        BASE64
            .decode(encoded)
            .map(Self)
            .map_err(|e| EngineError::MalformedInput(format!("nonce: {e}")))
    }

    /// Base64 encoding for transport.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    /// Raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Nonce length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for a zero-length nonce.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::generate(DEFAULT_NONCE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_nonce_has_default_length() {
        assert_eq!(Nonce::default().len(), DEFAULT_NONCE_LEN);
    }

    #[test]
    fn generated_nonces_differ() {
        assert_ne!(Nonce::generate(32), Nonce::generate(32));
    }

    #[test]
    fn base64_roundtrip() {
        let nonce = Nonce::from_bytes(b"fixed nonce".to_vec());
        assert_eq!(Nonce::from_base64(&nonce.to_base64()).unwrap(), nonce);
    }

    #[test]
    fn bad_base64_is_malformed_input() {
        assert!(matches!(
            Nonce::from_base64("***"),
            Err(EngineError::MalformedInput(_))
        ));
    }
}
