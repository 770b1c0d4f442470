//! # Error Types — Structured Error Hierarchy
//!
//! Errors raised while turning JSON-LD documents into canonical statements
//! and while resolving the documents those statements depend on. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Canonicalization errors name the offending construct or value.
//! - Resolution errors carry the IRI that could not be resolved.
//! - Nothing here is retryable: the same input always fails the same way.

use thiserror::Error;

/// Error during statement canonicalization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical statements. Numeric
    /// claims must be integers or typed string literals.
    #[error("float values are not permitted in canonical statements; use an integer or a typed string literal: {0}")]
    FloatRejected(f64),

    /// The document uses a JSON-LD construct the canonicalizer does not handle.
    #[error("unsupported JSON-LD construct: {0}")]
    Unsupported(String),

    /// Strict expansion met a term with no absolute IRI mapping.
    #[error("term {0:?} has no IRI mapping")]
    UnmappedTerm(String),

    /// The document shape is invalid (e.g. a non-object node, a non-string `@id`).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// A remote context could not be loaded.
    #[error("context resolution failed: {0}")]
    Context(#[from] ResolverError),

    /// Context processing recursed past the nesting limit.
    #[error("context nesting exceeds {0} levels (cyclic context reference?)")]
    ContextDepthExceeded(usize),

    /// A statement string is not a well-formed N-Quads line.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error resolving an IRI to a JSON document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// No document is registered for the IRI.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The registered document is not usable for the requested purpose.
    #[error("invalid document at {iri}: {reason}")]
    Invalid {
        /// The IRI that was resolved.
        iri: String,
        /// Why the document was rejected.
        reason: String,
    },
}
