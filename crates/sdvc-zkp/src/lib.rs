//! # sdvc-zkp — Selective-Disclosure Proof Engines
//!
//! Defines the capability interface of the signature engine behind
//! selective-disclosure credentials, and a transparent mock implementation.
//!
//! ## Architecture
//!
//! - **Traits** (`traits.rs`): `ProofEngine` covers signing an ordered
//!   message list, creating a proof that reveals a subset of messages and
//!   range-constrains hidden integer messages, and verifying such a proof.
//!   Mock and pairing-based engines are interchangeable behind it.
//!
//! - **Mock** (`mock.rs`): `MockProofEngine` produces deterministic SHA-256
//!   commitments. It enforces the same preconditions a real engine would
//!   (signature coverage, index bounds, range satisfaction) but offers no
//!   privacy.
//!
//! - **Keys and nonces** (`keys.rs`, `nonce.rs`): opaque key bytes with
//!   base58 transport, and CSPRNG nonces with base64 transport.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sdvc-*` crates.
//! - No `unsafe`.
//! - Verification returns `bool` and fails closed.

pub mod keys;
#[cfg(feature = "mock")]
pub mod mock;
pub mod nonce;
pub mod traits;

pub use keys::{KeyPair, PublicKey};
#[cfg(feature = "mock")]
pub use mock::MockProofEngine;
pub use nonce::{Nonce, DEFAULT_NONCE_LEN};
pub use traits::{EngineError, ProofEngine, ProofRequest, RangeTriple, VerifyRequest};
