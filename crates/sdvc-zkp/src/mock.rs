//! # Mock Proof Engine
//!
//! A deterministic, transparent engine for development and testing.
//! Signatures and proofs are SHA-256 commitments that are verifiable but
//! provide **no zero-knowledge or unforgeability guarantees**.
//!
//! ## How It Works
//!
//! - Public key: `SHA256("sdvc-mock-pk-v1:" || secret)`.
//! - Signature: `SHA256("sdvc-mock-sig-v1:" || pk || count || len-prefixed messages)`.
//! - `create_proof()` checks everything a real engine would refuse to prove:
//!   the signature covers the messages, indices are in range, and every
//!   range-constrained message is an integer within its bounds. It then
//!   commits to the public key, nonce, message count, the revealed
//!   `(index, message)` pairs, equivalences and range triples.
//! - `verify_proof()` recomputes the commitment from the verifier's view and
//!   compares in constant time.
//!
//! Proof layout: `[version: u8][message count: u32 LE][commitment: 32 bytes]`.
//!
//! ## Security Warning
//!
//! **NOT PRIVATE. NOT UNFORGEABLE.** Anyone holding the public key can
//! compute a valid signature or proof. It exists solely so the statement
//! indexing and range metadata protocol can be exercised end to end.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::keys::{KeyPair, PublicKey};
use crate::traits::{EngineError, ProofEngine, ProofRequest, RangeTriple, VerifyRequest};

/// Proof format version emitted by the mock engine.
pub const MOCK_PROOF_VERSION: u8 = 1;

const PK_TAG: &[u8] = b"sdvc-mock-pk-v1:";
const SIG_TAG: &[u8] = b"sdvc-mock-sig-v1:";
const PROOF_TAG: &[u8] = b"sdvc-mock-proof-v1:";
const PROOF_LEN: usize = 1 + 4 + 32;

/// Transparent SHA-256 proof engine. **Not for production.**
#[derive(Debug, Clone, Copy, Default)]
pub struct MockProofEngine;

impl MockProofEngine {
    /// Create a mock engine.
    pub fn new() -> Self {
        Self
    }

    fn expected_signature(public_key: &PublicKey, messages: &[Vec<u8>]) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(SIG_TAG);
        update_len_prefixed(&mut h, public_key.as_bytes());
        h.update(word(messages.len()));
        for message in messages {
            update_len_prefixed(&mut h, message);
        }
        h.finalize().into()
    }

    fn commitment(
        public_key: &PublicKey,
        nonce: &[u8],
        total: u32,
        revealed: &[(u32, &[u8])],
        equivalences: &[Vec<u32>],
        ranges: &[RangeTriple],
    ) -> [u8; 32] {
        let mut h = Sha256::new();
        h.update(PROOF_TAG);
        update_len_prefixed(&mut h, public_key.as_bytes());
        update_len_prefixed(&mut h, nonce);
        h.update(total.to_le_bytes());
        h.update(word(revealed.len()));
        for (index, message) in revealed {
            h.update(index.to_le_bytes());
            update_len_prefixed(&mut h, message);
        }
        h.update(word(equivalences.len()));
        for group in equivalences {
            h.update(word(group.len()));
            for index in group {
                h.update(index.to_le_bytes());
            }
        }
        h.update(word(ranges.len()));
        for range in ranges {
            for w in range.to_words() {
                h.update(w.to_le_bytes());
            }
        }
        h.finalize().into()
    }
}

impl ProofEngine for MockProofEngine {
    fn name(&self) -> &'static str {
        "mock-sha256"
    }

    fn key_pair_from_secret(&self, secret: &[u8]) -> Result<KeyPair, EngineError> {
        if secret.is_empty() {
            return Err(EngineError::MalformedInput("secret key is empty".to_string()));
        }
        let mut h = Sha256::new();
        h.update(PK_TAG);
        h.update(secret);
        let public = PublicKey::from_bytes(h.finalize().to_vec());
        Ok(KeyPair::new(secret.to_vec(), public))
    }

    fn sign(&self, key: &KeyPair, messages: &[Vec<u8>]) -> Result<Vec<u8>, EngineError> {
        if messages.is_empty() {
            return Err(EngineError::MalformedInput("no messages to sign".to_string()));
        }
        let derived = self.key_pair_from_secret(key.secret_bytes())?;
        if derived.public_key() != key.public_key() {
            return Err(EngineError::MalformedInput(
                "public key does not match secret key".to_string(),
            ));
        }
        Ok(Self::expected_signature(key.public_key(), messages).to_vec())
    }

    fn verify_signature(&self, public_key: &PublicKey, signature: &[u8], messages: &[Vec<u8>]) -> bool {
        let expected = Self::expected_signature(public_key, messages);
        bool::from(expected.as_slice().ct_eq(signature))
    }

    fn create_proof(&self, request: &ProofRequest<'_>) -> Result<Vec<u8>, EngineError> {
        let count = request.messages.len();
        if !self.verify_signature(request.public_key, request.signature, request.messages) {
            return Err(EngineError::InvalidSignature);
        }
        let total = u32::try_from(count)
            .map_err(|_| EngineError::MalformedInput(format!("{count} messages exceed u32")))?;

        let revealed_set = check_indices(request.revealed, count)?;
        for group in request.equivalences {
            check_indices(group, count)?;
        }
        for range in request.ranges {
            check_range_shape(range, count, &revealed_set)
                .map_err(|reason| match reason {
                    RangeShape::OutOfRange => EngineError::IndexOutOfRange {
                        index: range.message_index,
                        count,
                    },
                    RangeShape::Invalid(msg) => EngineError::MalformedInput(msg),
                })?;
            let value = integer_message(&request.messages[range.message_index as usize]).ok_or_else(|| {
                EngineError::MalformedInput(format!(
                    "range message {} is not an integer",
                    range.message_index
                ))
            })?;
            if value < i64::from(range.min) || value > i64::from(range.max) {
                return Err(EngineError::RangeUnsatisfied {
                    index: range.message_index,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        let revealed: Vec<(u32, &[u8])> = request
            .revealed
            .iter()
            .map(|&i| (i, request.messages[i as usize].as_slice()))
            .collect();
        let commitment = Self::commitment(
            request.public_key,
            request.nonce,
            total,
            &revealed,
            request.equivalences,
            request.ranges,
        );
        debug!(
            messages = count,
            revealed = revealed.len(),
            ranges = request.ranges.len(),
            "mock proof created"
        );

        let mut proof = Vec::with_capacity(PROOF_LEN);
        proof.push(MOCK_PROOF_VERSION);
        proof.extend_from_slice(&total.to_le_bytes());
        proof.extend_from_slice(&commitment);
        Ok(proof)
    }

    fn verify_proof(&self, request: &VerifyRequest<'_>) -> bool {
        if request.proof.len() != PROOF_LEN || request.proof[0] != MOCK_PROOF_VERSION {
            return false;
        }
        let mut total_bytes = [0u8; 4];
        total_bytes.copy_from_slice(&request.proof[1..5]);
        let total = u32::from_le_bytes(total_bytes);
        let count = total as usize;

        if request.messages.len() != request.revealed.len() {
            return false;
        }
        let Ok(revealed_set) = check_indices(request.revealed, count) else {
            return false;
        };
        if request
            .equivalences
            .iter()
            .any(|group| check_indices(group, count).is_err())
        {
            return false;
        }
        if request
            .ranges
            .iter()
            .any(|range| check_range_shape(range, count, &revealed_set).is_err())
        {
            return false;
        }

        let revealed: Vec<(u32, &[u8])> = request
            .revealed
            .iter()
            .copied()
            .zip(request.messages.iter().map(Vec::as_slice))
            .collect();
        let expected = Self::commitment(
            request.public_key,
            request.nonce,
            total,
            &revealed,
            request.equivalences,
            request.ranges,
        );
        bool::from(expected.as_slice().ct_eq(&request.proof[5..]))
    }
}

enum RangeShape {
    OutOfRange,
    Invalid(String),
}

fn check_indices(indices: &[u32], count: usize) -> Result<BTreeSet<u32>, EngineError> {
    let mut seen = BTreeSet::new();
    for &index in indices {
        if index as usize >= count {
            return Err(EngineError::IndexOutOfRange { index, count });
        }
        if !seen.insert(index) {
            return Err(EngineError::MalformedInput(format!("duplicate index {index}")));
        }
    }
    Ok(seen)
}

fn check_range_shape(range: &RangeTriple, count: usize, revealed: &BTreeSet<u32>) -> Result<(), RangeShape> {
    if range.message_index as usize >= count {
        return Err(RangeShape::OutOfRange);
    }
    if revealed.contains(&range.message_index) {
        return Err(RangeShape::Invalid(format!(
            "range message {} is also revealed",
            range.message_index
        )));
    }
    if range.min > range.max {
        return Err(RangeShape::Invalid(format!(
            "range [{}, {}] is inverted",
            range.min, range.max
        )));
    }
    Ok(())
}

/// Parse a zero-prefixed decimal integer message.
fn integer_message(message: &[u8]) -> Option<i64> {
    let body = message.strip_prefix(&[0u8]).unwrap_or(message);
    std::str::from_utf8(body).ok()?.parse().ok()
}

fn word(n: usize) -> [u8; 8] {
    (n as u64).to_le_bytes()
}

fn update_len_prefixed(h: &mut Sha256, bytes: &[u8]) {
    h.update(word(bytes.len()));
    h.update(bytes);
}
