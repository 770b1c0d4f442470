//! # Proof Engine Trait
//!
//! Defines the capability interface of a multi-message signature scheme with
//! selective disclosure and range proofs. All engines (the mock, a
//! pairing-based backend) must satisfy this trait.
//!
//! ## Security Invariant
//!
//! The trait requires `Send + Sync` bounds for safe concurrent access.
//! Engines hold no per-call state. Verification fails closed: it returns
//! `false` for every mismatch and never uses an error to signal "did not
//! verify".
//!
//! ## Message Convention
//!
//! Callers prefix every message with a single zero byte before handing it to
//! an engine. Engines receive the prefixed bytes and must see the same
//! prefixed bytes at signing, proof creation, and verification.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{KeyPair, PublicKey};

/// Length of secrets produced by [`ProofEngine::generate_key_pair`].
pub const SECRET_KEY_LEN: usize = 32;

/// Error during signing or proof creation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The base signature does not cover the supplied messages under the key.
    #[error("signature does not verify over the supplied messages")]
    InvalidSignature,

    /// A revealed, range, or equivalence index points past the message list.
    #[error("message index {index} out of range for {count} messages")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// Number of messages.
        count: usize,
    },

    /// A hidden integer message lies outside its declared bounds.
    #[error("message {index} is outside its range [{min}, {max}]")]
    RangeUnsatisfied {
        /// Message index.
        index: u32,
        /// Lower bound (inclusive).
        min: u32,
        /// Upper bound (inclusive).
        max: u32,
    },

    /// Structurally invalid input: bad key, duplicate index, non-integer
    /// range message, inverted bounds.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

/// A range constraint: the hidden integer message at `message_index` lies in
/// `[min, max]`.
///
/// `message_index` indexes the message list handed to the engine
/// (statements followed by injected integer messages), not the statement
/// list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeTriple {
    /// Position in the message list.
    pub message_index: u32,
    /// Lower bound (inclusive).
    pub min: u32,
    /// Upper bound (inclusive).
    pub max: u32,
}

impl RangeTriple {
    /// Construct a triple.
    pub fn new(message_index: u32, min: u32, max: u32) -> Self {
        Self {
            message_index,
            min,
            max,
        }
    }

    /// The triple as three words, in transport order.
    pub fn to_words(self) -> [u32; 3] {
        [self.message_index, self.min, self.max]
    }
}

/// Arguments of a proof creation.
#[derive(Debug, Clone, Copy)]
pub struct ProofRequest<'a> {
    /// Base signature over all messages.
    pub signature: &'a [u8],
    /// Issuer public key.
    pub public_key: &'a PublicKey,
    /// Every signed message, zero-prefixed, in signing order.
    pub messages: &'a [Vec<u8>],
    /// Proof nonce.
    pub nonce: &'a [u8],
    /// Indices of disclosed messages.
    pub revealed: &'a [u32],
    /// Groups of hidden messages proven equal. Usually empty.
    pub equivalences: &'a [Vec<u32>],
    /// Range constraints on hidden integer messages.
    pub ranges: &'a [RangeTriple],
}

/// Arguments of a proof verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifyRequest<'a> {
    /// Proof bytes from [`ProofEngine::create_proof`].
    pub proof: &'a [u8],
    /// Issuer public key.
    pub public_key: &'a PublicKey,
    /// The disclosed messages, zero-prefixed, paired positionally with
    /// `revealed`.
    pub messages: &'a [Vec<u8>],
    /// Proof nonce.
    pub nonce: &'a [u8],
    /// Indices of the disclosed messages.
    pub revealed: &'a [u32],
    /// Equivalence groups the proof was created with.
    pub equivalences: &'a [Vec<u32>],
    /// Range constraints the proof was created with.
    pub ranges: &'a [RangeTriple],
}

/// Abstract interface for a selective-disclosure signature engine.
///
/// Each implementation defines its own key, signature and proof byte
/// layouts. Callers treat all of them as opaque.
pub trait ProofEngine: Send + Sync {
    /// Short engine identifier for logs.
    fn name(&self) -> &'static str;

    /// Derive a key pair from secret key bytes.
    fn key_pair_from_secret(&self, secret: &[u8]) -> Result<KeyPair, EngineError>;

    /// Sign an ordered message list.
    fn sign(&self, key: &KeyPair, messages: &[Vec<u8>]) -> Result<Vec<u8>, EngineError>;

    /// Check a base signature. Never errors.
    fn verify_signature(&self, public_key: &PublicKey, signature: &[u8], messages: &[Vec<u8>]) -> bool;

    /// Create a selective-disclosure proof.
    fn create_proof(&self, request: &ProofRequest<'_>) -> Result<Vec<u8>, EngineError>;

    /// Verify a selective-disclosure proof. Never errors.
    fn verify_proof(&self, request: &VerifyRequest<'_>) -> bool;

    /// Generate a fresh key pair from the OS CSPRNG.
    fn generate_key_pair(&self) -> Result<KeyPair, EngineError> {
        let mut secret = vec![0u8; SECRET_KEY_LEN];
        OsRng.fill_bytes(&mut secret);
        self.key_pair_from_secret(&secret)
    }

    /// Create one proof per credential. Fails if any single proof fails.
    fn create_proof_multi(&self, requests: &[ProofRequest<'_>]) -> Result<Vec<Vec<u8>>, EngineError> {
        requests.iter().map(|r| self.create_proof(r)).collect()
    }

    /// Verify a batch of proofs. An empty batch does not verify.
    fn verify_proof_multi(&self, requests: &[VerifyRequest<'_>]) -> bool {
        !requests.is_empty() && requests.iter().all(|r| self.verify_proof(r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_triple_words_are_index_min_max() {
        assert_eq!(RangeTriple::new(9, 18, 60).to_words(), [9, 18, 60]);
    }

    #[test]
    fn range_triple_serializes_camel_case() {
        let json = serde_json::to_value(RangeTriple::new(1, 2, 3)).unwrap();
        assert_eq!(json["messageIndex"], 1);
        assert_eq!(json["min"], 2);
        assert_eq!(json["max"], 3);
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::IndexOutOfRange { index: 7, count: 3 };
        assert_eq!(format!("{err}"), "message index 7 out of range for 3 messages");
        let err = EngineError::RangeUnsatisfied { index: 9, min: 18, max: 60 };
        assert!(format!("{err}").contains("[18, 60]"));
    }
}
