//! # BBS+ Signature Suite
//!
//! Issues `BbsBlsSignature2020` proofs and checks them.
//!
//! The signed message list is exactly the list a holder later derives
//! from: proof statements, then document statements, then every canonical
//! integer literal appended as a plaintext message. Each message is
//! zero-prefixed.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use sdvc_core::{Canonicalizer, DocumentResolver, JsonLdCanonicalizer, Statement};
use sdvc_zkp::{KeyPair, ProofEngine};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::credential::{attach_proof, proof_statements, split_proof};
use crate::error::VcError;
use crate::message::assemble;
use crate::proof::{Proof, ProofPurpose, ProofType};
use crate::purpose::ProofPurposeCheck;
use crate::range::extract_ranges;
use crate::suite::VerificationResult;
use crate::verification_method::resolve_verification_method;

/// Proof options chosen by the issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOptions {
    /// IRI of the signing key.
    pub verification_method: String,
    /// Purpose written into the proof.
    pub proof_purpose: ProofPurpose,
    /// Creation time. Defaults to now, to the second.
    pub created: Option<String>,
}

impl SignatureOptions {
    /// Options for an assertion proof by `verification_method`.
    pub fn new(verification_method: impl Into<String>) -> Self {
        Self {
            verification_method: verification_method.into(),
            proof_purpose: ProofPurpose::AssertionMethod,
            created: None,
        }
    }

    /// Fix the creation time.
    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = Some(created.into());
        self
    }
}

/// Signs credentials and verifies base signatures.
#[derive(Clone)]
pub struct BbsSignatureSuite {
    engine: Arc<dyn ProofEngine>,
    canonicalizer: Arc<dyn Canonicalizer>,
}

impl BbsSignatureSuite {
    /// A suite over `engine` with the built-in canonicalizer.
    pub fn new(engine: Arc<dyn ProofEngine>) -> Self {
        Self {
            engine,
            canonicalizer: Arc::new(JsonLdCanonicalizer::new()),
        }
    }

    /// Replace the canonicalizer.
    pub fn with_canonicalizer(mut self, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    /// Sign `document` and return it with a `BbsBlsSignature2020` proof
    /// attached. Any existing proof is replaced.
    ///
    /// # Errors
    ///
    /// Returns `Canonicalization` if the document or proof options cannot
    /// be canonicalized and `Engine` if signing fails.
    pub fn sign(
        &self,
        document: &Value,
        key: &KeyPair,
        options: &SignatureOptions,
        resolver: &dyn DocumentResolver,
    ) -> Result<Value, VcError> {
        let mut unsigned = document.clone();
        if let Some(obj) = unsigned.as_object_mut() {
            obj.remove("proof");
        }
        let created = options
            .created
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut proof = json!({
            "type": ProofType::BbsBlsSignature2020.as_str(),
            "created": created,
            "verificationMethod": options.verification_method,
            "proofPurpose": options.proof_purpose.as_str(),
        });

        let messages = self.signed_messages(&unsigned, &proof, resolver)?;
        let signature = self.engine.sign(key, &messages)?;
        debug!(engine = self.engine.name(), messages = messages.len(), "signed credential");

        proof["proofValue"] = Value::String(BASE64.encode(signature));
        attach_proof(&unsigned, proof)
    }

    /// Verify the base signature on a signed document.
    ///
    /// A bad signature or purpose yields `verified: false`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedProofType` for non-signature proofs,
    /// canonicalization failures, and verification method lookup failures.
    pub fn verify_signature(
        &self,
        signed: &Value,
        purpose: &dyn ProofPurposeCheck,
        resolver: &dyn DocumentResolver,
    ) -> Result<VerificationResult, VcError> {
        let (document, proof_value) = split_proof(signed)?;
        let proof = Proof::from_value(&proof_value)?;
        if proof.kind() != Some(ProofType::BbsBlsSignature2020) {
            return Err(VcError::UnsupportedProofType(proof.proof_type));
        }
        let method = resolve_verification_method(&proof.verification_method, resolver)?;

        let signature = match decode_signature(&proof) {
            Ok(signature) => signature,
            Err(e) => return Ok(VerificationResult::rejected(e)),
        };
        let messages = self.signed_messages(&document, &proof_value, resolver)?;
        if !self
            .engine
            .verify_signature(&method.public_key, &signature, &messages)
        {
            warn!(method = %method.id, "base signature rejected");
            return Ok(VerificationResult::rejected(VcError::EngineVerificationFailed));
        }
        if let Err(e) = purpose.validate(&proof, &method, resolver) {
            warn!(method = %method.id, error = %e, "proof purpose rejected");
            return Ok(VerificationResult::rejected(e));
        }
        Ok(VerificationResult::verified())
    }

    /// The full message list a base signature covers.
    pub(crate) fn signed_messages(
        &self,
        document: &Value,
        proof: &Value,
        resolver: &dyn DocumentResolver,
    ) -> Result<Vec<Vec<u8>>, VcError> {
        let statements = signed_statements(self.canonicalizer.as_ref(), document, proof, resolver)?;
        let all = statements.all();
        let ranges = extract_ranges(&all, statements.proof.len(), &[])?;
        Ok(assemble(&all, &ranges.injected))
    }
}

/// Proof and document segments of the signed statement list.
pub(crate) struct SignedStatements {
    pub(crate) proof: Vec<Statement>,
    pub(crate) document: Vec<Statement>,
}

impl SignedStatements {
    pub(crate) fn all(&self) -> Vec<Statement> {
        self.proof.iter().chain(&self.document).cloned().collect()
    }
}

/// Canonicalize a base-signature proof and its document.
pub(crate) fn signed_statements(
    canonicalizer: &dyn Canonicalizer,
    document: &Value,
    proof: &Value,
    resolver: &dyn DocumentResolver,
) -> Result<SignedStatements, VcError> {
    Ok(SignedStatements {
        proof: proof_statements(
            canonicalizer,
            proof,
            document,
            Some(ProofType::BbsBlsSignature2020),
            resolver,
        )?,
        document: canonicalizer.canonicalize(document, resolver)?,
    })
}

fn decode_signature(proof: &Proof) -> Result<Vec<u8>, VcError> {
    let value = proof
        .proof_value
        .as_ref()
        .ok_or(VcError::MissingProofField("proofValue"))?;
    let segments = value.segments();
    let [segment] = segments.as_slice() else {
        return Err(VcError::InvalidEncoding {
            field: "proofValue",
            reason: "a base signature has exactly one value".to_string(),
        });
    };
    BASE64.decode(segment).map_err(|e| VcError::InvalidEncoding {
        field: "proofValue",
        reason: e.to_string(),
    })
}

/// Decode the base signature of an input proof. Used by derivation.
pub(crate) fn base_signature(proof: &Proof) -> Result<Vec<u8>, VcError> {
    decode_signature(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::purpose::AssertionProofPurpose;

    #[test]
    fn signed_credential_carries_base_signature() {
        let fx = fixtures::Fixture::new();
        let signed = fx.signed();
        let proof = &signed["proof"];
        assert_eq!(proof["type"], "BbsBlsSignature2020");
        assert_eq!(proof["verificationMethod"], fixtures::KEY_ID);
        assert_eq!(proof["proofPurpose"], "assertionMethod");
        assert_eq!(proof["created"], fixtures::CREATED);
        assert!(proof["proofValue"].is_string());
    }

    #[test]
    fn signature_verifies() {
        let fx = fixtures::Fixture::new();
        let result = fx
            .signature_suite()
            .verify_signature(&fx.signed(), &AssertionProofPurpose::new(), &fx.resolver)
            .unwrap();
        assert!(result.verified, "{:?}", result.error);
    }

    #[test]
    fn altered_claim_fails_signature() {
        let fx = fixtures::Fixture::new();
        let mut signed = fx.signed();
        signed["credentialSubject"]["name"] = json!("Mallory");
        let result = fx
            .signature_suite()
            .verify_signature(&signed, &AssertionProofPurpose::new(), &fx.resolver)
            .unwrap();
        assert!(!result.verified);
        assert!(matches!(result.error, Some(VcError::EngineVerificationFailed)));
    }

    #[test]
    fn garbage_proof_value_is_rejected_not_raised() {
        let fx = fixtures::Fixture::new();
        let mut signed = fx.signed();
        signed["proof"]["proofValue"] = json!("***");
        let result = fx
            .signature_suite()
            .verify_signature(&signed, &AssertionProofPurpose::new(), &fx.resolver)
            .unwrap();
        assert!(!result.verified);
    }

    #[test]
    fn signing_is_deterministic_for_fixed_created() {
        let fx = fixtures::Fixture::new();
        assert_eq!(fx.signed(), fx.signed());
    }
}
