//! # Async Proof Service
//!
//! Runs derivation and verification off the async executor. Engine work is
//! CPU-bound, so each call moves to the blocking pool and is bounded by the
//! configured engine timeout.

use std::sync::Arc;

use sdvc_core::DocumentResolver;
use sdvc_zkp::Nonce;
use serde_json::Value;
use tracing::warn;

use crate::error::VcError;
use crate::purpose::ProofPurposeCheck;
use crate::suite::{BbsProofSuite, DerivedCredential, VerificationResult};

/// Shared, async front end to a [`BbsProofSuite`].
#[derive(Clone)]
pub struct ProofService {
    suite: Arc<BbsProofSuite>,
    resolver: Arc<dyn DocumentResolver>,
}

impl std::fmt::Debug for ProofService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProofService")
            .field("engine", &self.suite.engine().name())
            .field("config", self.suite.config())
            .finish_non_exhaustive()
    }
}

impl ProofService {
    pub fn new(suite: BbsProofSuite, resolver: Arc<dyn DocumentResolver>) -> Self {
        Self {
            suite: Arc::new(suite),
            resolver,
        }
    }

    /// Derive a proof from `signed` revealing what `reveal_document` selects.
    pub async fn derive(
        &self,
        signed: Value,
        reveal_document: Value,
        nonce: Option<Nonce>,
    ) -> Result<DerivedCredential, VcError> {
        let suite = Arc::clone(&self.suite);
        let resolver = Arc::clone(&self.resolver);
        self.run(move || suite.derive_proof(&signed, &reveal_document, nonce, resolver.as_ref()))
            .await
    }

    /// Verify a derived proof attached to `signed`.
    pub async fn verify(
        &self,
        signed: Value,
        purpose: Arc<dyn ProofPurposeCheck>,
    ) -> Result<VerificationResult, VcError> {
        let suite = Arc::clone(&self.suite);
        let resolver = Arc::clone(&self.resolver);
        self.run(move || suite.verify_proof(&signed, purpose.as_ref(), resolver.as_ref()))
            .await
    }

    async fn run<T, F>(&self, task: F) -> Result<T, VcError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, VcError> + Send + 'static,
    {
        let limit = self.suite.config().engine_timeout;
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(task)).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(VcError::TaskFailed(join.to_string())),
            Err(_) => {
                warn!(timeout_ms = limit.as_millis() as u64, "proof engine call timed out");
                Err(VcError::EngineTimeout(limit))
            }
        }
    }
}
