//! # Document Resolution
//!
//! Contexts, verification methods, and controller documents are looked up
//! by IRI through a [`DocumentResolver`] that the caller passes into every
//! operation. There is no process-wide document registry.
//!
//! [`StaticResolver`] is an in-memory map. It is read-only once built and
//! can be shared across threads behind an `Arc`.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::ResolverError;

/// IRI of the W3C credentials v1 context.
pub const CREDENTIALS_V1: &str = "https://www.w3.org/2018/credentials/v1";
/// IRI of the BBS+ signature suite v1 context.
pub const BBS_V1: &str = "https://w3id.org/security/bbs/v1";

const CREDENTIALS_V1_JSON: &str = include_str!("../contexts/credentials-v1.json");
const BBS_V1_JSON: &str = include_str!("../contexts/bbs-v1.json");

/// Resolves an IRI to a JSON document.
///
/// Implementations must be deterministic for the lifetime of a derive or
/// verify call: the same IRI must resolve to the same document on every
/// lookup, or statement indexing breaks.
pub trait DocumentResolver: Send + Sync {
    /// Fetch the document registered for `iri`.
    fn resolve(&self, iri: &str) -> Result<Value, ResolverError>;
}

impl<T: DocumentResolver + ?Sized> DocumentResolver for &T {
    fn resolve(&self, iri: &str) -> Result<Value, ResolverError> {
        (**self).resolve(iri)
    }
}

impl<T: DocumentResolver + ?Sized> DocumentResolver for std::sync::Arc<T> {
    fn resolve(&self, iri: &str) -> Result<Value, ResolverError> {
        (**self).resolve(iri)
    }
}

/// An in-memory IRI → document map.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    documents: HashMap<String, Value>,
}

impl StaticResolver {
    /// An empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver preloaded with the credentials v1 and BBS v1 contexts.
    ///
    /// The bundled contexts are subsets of the published documents that
    /// cover the terms used by credentials and BBS+ proofs.
    pub fn with_builtin_contexts() -> Result<Self, ResolverError> {
        let mut resolver = Self::new();
        for (iri, text) in [(CREDENTIALS_V1, CREDENTIALS_V1_JSON), (BBS_V1, BBS_V1_JSON)] {
            let doc: Value = serde_json::from_str(text).map_err(|e| ResolverError::Invalid {
                iri: iri.to_string(),
                reason: e.to_string(),
            })?;
            resolver.insert(iri, doc);
        }
        Ok(resolver)
    }

    /// Register (or replace) a document.
    pub fn insert(&mut self, iri: impl Into<String>, document: Value) -> &mut Self {
        self.documents.insert(iri.into(), document);
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_document(mut self, iri: impl Into<String>, document: Value) -> Self {
        self.insert(iri, document);
        self
    }

    /// Register every entry of a JSON object mapping IRI → document.
    pub fn extend_from_map(&mut self, map: &Value) -> Result<(), ResolverError> {
        let obj = map.as_object().ok_or_else(|| ResolverError::Invalid {
            iri: "<document map>".to_string(),
            reason: "expected a JSON object keyed by IRI".to_string(),
        })?;
        for (iri, doc) in obj {
            self.insert(iri.clone(), doc.clone());
        }
        Ok(())
    }

    /// Number of registered documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true if no documents are registered.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl DocumentResolver for StaticResolver {
    fn resolve(&self, iri: &str) -> Result<Value, ResolverError> {
        self.documents
            .get(iri)
            .cloned()
            .ok_or_else(|| ResolverError::NotFound(iri.to_string()))
    }
}
