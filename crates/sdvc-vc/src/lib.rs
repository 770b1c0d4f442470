//! # sdvc-vc — Selective-Disclosure Verifiable Credentials
//!
//! Implements the BBS+ proof suites for W3C Verifiable Credentials:
//!
//! - **Signature** (`signature.rs`): issues and checks `BbsBlsSignature2020`
//!   base signatures over every canonical statement of a credential.
//!
//! - **Suite** (`suite.rs`): derives `BbsBlsSignatureProof2020` proofs that
//!   disclose a framed subset of statements and prove hidden integers lie in
//!   a range, and verifies them.
//!
//! - **Framing** (`pattern.rs`, `frame.rs`): reveal patterns and the framer
//!   that applies them to the signed statement graph.
//!
//! - **Index mapping, ranges, metadata** (`index.rs`, `range.rs`,
//!   `metadata.rs`, `message.rs`): the statement bookkeeping shared by
//!   prover and verifier.
//!
//! - **Service** (`service.rs`): async front end bounded by an engine
//!   timeout.
//!
//! ## Security Invariant
//!
//! Every statement a derived proof discloses is located among the statements
//! the issuer signed, by exact string equality. Derivation fails rather than
//! emit a proof over statements that were never signed.
//!
//! ## Crate Policy
//!
//! - Depends on `sdvc-core` for canonicalization and `sdvc-zkp` for the
//!   proof engine.
//! - Documents remain `serde_json::Value`: `credentialSubject` is
//!   open-ended and must canonicalize exactly as issued.

pub mod config;
pub mod credential;
pub mod error;
pub mod frame;
pub mod index;
pub mod message;
pub mod metadata;
pub mod pattern;
pub mod proof;
pub mod purpose;
pub mod range;
pub mod service;
pub mod signature;
pub mod suite;
pub mod verification_method;

#[cfg(test)]
pub(crate) mod fixtures;

pub use config::{ConfigError, SuiteConfig};
pub use credential::{assign_missing_id, attach_proof, proof_options, split_proof};
pub use error::VcError;
pub use frame::{bind_pattern, GraphFramer, RevealFramer};
pub use index::map_reveal_indices;
pub use metadata::{MetadataFormat, ProofMetadata};
pub use pattern::RevealPattern;
pub use proof::{Proof, ProofPurpose, ProofType, ProofValue};
pub use purpose::{AssertionProofPurpose, ProofPurposeCheck};
pub use range::{extract_ranges, RangeExtraction, RangeField};
pub use service::ProofService;
pub use signature::{BbsSignatureSuite, SignatureOptions};
pub use suite::{BbsProofSuite, DerivedCredential, VerificationResult};
pub use verification_method::{resolve_verification_method, VerificationMethod};
