//! # Error Types
//!
//! One error enum covers signing, derivation, and verification of
//! selective-disclosure credentials.
//!
//! ## Design
//!
//! - Derivation errors are surfaced to the caller; no partial proof is
//!   ever returned.
//! - Verification distinguishes *configuration* problems (unsupported proof
//!   type, unknown or revoked key, unparseable document) from a proof that
//!   simply does not check out. The latter is reported as a negative
//!   [`VerificationResult`](crate::VerificationResult), never as an `Err`.

use std::time::Duration;

use sdvc_core::{CanonicalizationError, ResolverError};
use sdvc_zkp::EngineError;
use thiserror::Error;

/// Error during signing, proof derivation, or proof verification.
#[derive(Error, Debug)]
pub enum VcError {
    /// The proof's `type` is not one this suite handles.
    #[error("unsupported proof type: {0}")]
    UnsupportedProofType(String),

    /// A revealed statement is not among the signed document statements.
    #[error("revealed statement is not part of the signed document: {statement}")]
    RevealMismatch {
        /// The first revealed statement that could not be located.
        statement: String,
    },

    /// The metadata word sequence carried in `domain` is malformed.
    #[error("proof metadata is corrupt: {0}")]
    MetadataCorrupt(String),

    /// The verification method IRI does not resolve to a key document.
    #[error("verification method not found: {0}")]
    VerificationMethodNotFound(String),

    /// The verification method document carries a `revoked` marker.
    #[error("verification method has been revoked: {0}")]
    VerificationMethodRevoked(String),

    /// The proof engine rejected the proof.
    #[error("proof engine rejected the proof")]
    EngineVerificationFailed,

    /// The proof purpose check failed.
    #[error("proof purpose check failed: {0}")]
    InvalidProofPurpose(String),

    /// A `range-<min>-<max>` sentinel in the reveal pattern is malformed.
    #[error("invalid range sentinel {value:?}: {reason}")]
    InvalidRangeSentinel {
        /// The sentinel as written.
        value: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A field the operation requires is absent from the proof.
    #[error("proof is missing required field {0}")]
    MissingProofField(&'static str),

    /// A proof field does not decode.
    #[error("invalid {field} encoding: {reason}")]
    InvalidEncoding {
        /// Which field failed to decode.
        field: &'static str,
        /// Decoder error.
        reason: String,
    },

    /// A document or reveal pattern has an unusable shape.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A proof engine call did not complete in time.
    #[error("proof engine call exceeded {0:?}")]
    EngineTimeout(Duration),

    /// A blocking proof task panicked or was cancelled.
    #[error("proof task failed: {0}")]
    TaskFailed(String),

    /// Canonicalization of a document or proof failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Signing or proof creation failed inside the engine.
    #[error("proof engine error: {0}")]
    Engine(#[from] EngineError),

    /// A referenced document could not be resolved.
    #[error("document resolution failed: {0}")]
    Resolver(#[from] ResolverError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
