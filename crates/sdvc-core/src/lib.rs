//! # sdvc-core — Canonical Statements for Selective Disclosure
//!
//! This crate turns JSON-LD credentials into the ordered list of canonical
//! statements that a multi-message signature signs one message at a time.
//! Every other crate in the workspace depends on `sdvc-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Statements are validated newtypes.** A [`Statement`] always parses
//!    back into a [`Quad`]; there is no way to hand a malformed line to the
//!    signing layer.
//!
//! 2. **Canonicalization is a trait.** [`Canonicalizer`] is the seam; the
//!    built-in [`JsonLdCanonicalizer`] covers the JSON-LD subset used by
//!    credentials and BBS+ proofs and is fully deterministic.
//!
//! 3. **Documents are resolved explicitly.** Contexts and key documents are
//!    looked up through a [`DocumentResolver`] passed into every call. There
//!    is no global document cache.
//!
//! 4. **Blank nodes are made stable before framing.** [`bnode`] rewrites
//!    canonical labels to synthetic IRIs and back.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sdvc-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bnode;
pub mod canonical;
pub mod context;
pub mod dataset;
pub mod error;
pub mod expand;
pub mod resolver;
pub mod statement;

// Re-export primary types for ergonomic imports.
pub use canonical::{literal_from_value_object, Canonicalizer, JsonLdCanonicalizer};
pub use context::ActiveContext;
pub use dataset::{Dataset, NodeRecord};
pub use error::{CanonicalizationError, ResolverError};
pub use resolver::{DocumentResolver, StaticResolver};
pub use statement::{Literal, Quad, Statement, Term};
