//! # BBS+ Derived Proof Suite
//!
//! Derives `BbsBlsSignatureProof2020` proofs from signed credentials and
//! verifies them.
//!
//! ## How It Works
//!
//! Derivation:
//!
//! 1. Canonicalize the proof options and the document. Their concatenation
//!    is the signed statement list.
//! 2. Rewrite canonical blank nodes in the document statements to synthetic
//!    IRIs, check the reveal pattern against the result, and frame it.
//! 3. Canonicalize the framed document and map each of its statements back
//!    to a signed position. Every proof statement is always revealed.
//! 4. Append every integer literal as a plaintext message and record a range
//!    triple for each range-bound field of the node it was written on.
//! 5. Ask the engine for a proof over the full message list, and carry the
//!    revealed indices and range triples in the proof's `domain` field.
//!
//! Verification rebuilds the revealed messages from the disclosed document
//! and proof, restores blank node labels, and hands them to the engine with
//! the decoded metadata.
//!
//! ## Security Invariant
//!
//! A revealed statement that cannot be located among the signed statements
//! aborts derivation. A malformed derived proof verifies false; it never
//! panics.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sdvc_core::bnode::{from_synthetic_iris, to_synthetic_iris};
use sdvc_core::{Canonicalizer, Dataset, DocumentResolver, JsonLdCanonicalizer, Statement};
use sdvc_zkp::{Nonce, ProofEngine, ProofRequest, VerifyRequest};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SuiteConfig;
use crate::credential::{attach_proof, proof_statements, split_proof};
use crate::error::VcError;
use crate::frame::{bind_pattern, GraphFramer, RevealFramer};
use crate::index::map_reveal_indices;
use crate::message::assemble;
use crate::metadata::ProofMetadata;
use crate::pattern::RevealPattern;
use crate::proof::{Proof, ProofType, ProofValue, SECURITY_DOMAIN};
use crate::purpose::ProofPurposeCheck;
use crate::range::extract_ranges;
use crate::signature::{base_signature, signed_statements};
use crate::verification_method::resolve_verification_method;

/// Outcome of verifying a proof.
#[derive(Debug)]
pub struct VerificationResult {
    /// Whether the proof verified.
    pub verified: bool,
    /// Why it did not.
    pub error: Option<VcError>,
}

impl VerificationResult {
    /// A passing result.
    pub fn verified() -> Self {
        Self {
            verified: true,
            error: None,
        }
    }

    /// A failing result carrying its reason.
    pub fn rejected(error: VcError) -> Self {
        Self {
            verified: false,
            error: Some(error),
        }
    }
}

/// A derived credential: the disclosed document and its proof.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedCredential {
    /// The framed document, without proof.
    pub document: Value,
    /// The `BbsBlsSignatureProof2020` proof.
    pub proof: Proof,
    /// What the proof's `domain` field carries.
    pub metadata: ProofMetadata,
}

impl DerivedCredential {
    /// The document with its proof attached.
    pub fn into_signed_document(self) -> Result<Value, VcError> {
        let proof = self.proof.to_value()?;
        attach_proof(&self.document, proof)
    }
}

/// Derives and verifies selective-disclosure proofs.
#[derive(Clone)]
pub struct BbsProofSuite {
    engine: Arc<dyn ProofEngine>,
    canonicalizer: Arc<dyn Canonicalizer>,
    framer: Arc<dyn RevealFramer>,
    config: SuiteConfig,
}

impl BbsProofSuite {
    /// A suite over `engine` with the built-in canonicalizer and framer and
    /// the default configuration.
    pub fn new(engine: Arc<dyn ProofEngine>) -> Self {
        Self {
            engine,
            canonicalizer: Arc::new(JsonLdCanonicalizer::new()),
            framer: Arc::new(GraphFramer::new()),
            config: SuiteConfig::default(),
        }
    }

    /// Replace the canonicalizer.
    pub fn with_canonicalizer(mut self, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        self.canonicalizer = canonicalizer;
        self
    }

    /// Replace the framer.
    pub fn with_framer(mut self, framer: Arc<dyn RevealFramer>) -> Self {
        self.framer = framer;
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: SuiteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn ProofEngine> {
        &self.engine
    }

    /// Derive a proof from a signed document.
    ///
    /// # Errors
    ///
    /// See [`BbsProofSuite::derive`].
    pub fn derive_proof(
        &self,
        signed: &Value,
        reveal_document: &Value,
        nonce: Option<Nonce>,
        resolver: &dyn DocumentResolver,
    ) -> Result<DerivedCredential, VcError> {
        let (document, proof) = split_proof(signed)?;
        self.derive(&document, &proof, reveal_document, nonce, resolver)
    }

    /// Derive a proof disclosing what `reveal_document` selects.
    ///
    /// A fresh nonce is generated when none is given.
    ///
    /// # Errors
    ///
    /// - `UnsupportedProofType` unless `proof` is a `BbsBlsSignature2020`.
    /// - `Canonicalization` if any document fails to canonicalize.
    /// - `RevealMismatch` if a disclosed statement was never signed, or the
    ///   pattern asks for a property a matched node does not have.
    /// - `InvalidRangeSentinel` for a malformed range sentinel, or one on a
    ///   field that is not a signed integer.
    /// - `Engine` if the engine refuses, including unsatisfied ranges.
    pub fn derive(
        &self,
        document: &Value,
        proof: &Value,
        reveal_document: &Value,
        nonce: Option<Nonce>,
        resolver: &dyn DocumentResolver,
    ) -> Result<DerivedCredential, VcError> {
        let input = Proof::from_value(proof)?;
        if input.kind() != Some(ProofType::BbsBlsSignature2020) {
            return Err(VcError::UnsupportedProofType(input.proof_type));
        }
        let signature = base_signature(&input)?;
        let method = resolve_verification_method(&input.verification_method, resolver)?;

        let signed = signed_statements(self.canonicalizer.as_ref(), document, proof, resolver)?;
        let all = signed.all();
        let transformed = to_synthetic_iris(&signed.document)?;
        debug!(
            proof_statements = signed.proof.len(),
            document_statements = signed.document.len(),
            "canonicalized signed credential"
        );

        let pattern = RevealPattern::from_document(reveal_document, resolver)?;
        let dataset = Dataset::from_statements(&transformed)?;
        let range_fields = bind_pattern(&dataset, &pattern)?;
        let framed = self.framer.frame(&dataset, &pattern)?;
        let revealed_statements = self.canonicalizer.canonicalize(&framed, resolver)?;
        debug!(revealed = revealed_statements.len(), "framed reveal document");

        let revealed = map_reveal_indices(signed.proof.len(), &transformed, &revealed_statements)?;
        let ranges = extract_ranges(&all, signed.proof.len(), &range_fields)?;
        let metadata = ProofMetadata::new(revealed, ranges.triples);
        let domain = metadata.encode(self.config.metadata_format)?;
        debug!(
            revealed = metadata.revealed.len(),
            ranges = metadata.ranges.len(),
            injected = ranges.injected.len(),
            "built proof metadata"
        );

        let messages = assemble(&all, &ranges.injected);
        let nonce = nonce.unwrap_or_else(|| Nonce::generate(self.config.nonce_len));
        let request = ProofRequest {
            signature: &signature,
            public_key: &method.public_key,
            messages: &messages,
            nonce: nonce.as_bytes(),
            revealed: &metadata.revealed,
            equivalences: &[],
            ranges: &metadata.ranges,
        };
        let segments = self.engine.create_proof_multi(&[request])?;
        info!(
            engine = self.engine.name(),
            messages = messages.len(),
            revealed = metadata.revealed.len(),
            ranges = metadata.ranges.len(),
            "derived selective-disclosure proof"
        );

        let derived = Proof {
            context: proof_context(&input, document),
            proof_type: ProofType::BbsBlsSignatureProof2020.as_str().to_string(),
            created: input.created,
            verification_method: input.verification_method,
            proof_purpose: input.proof_purpose,
            proof_value: Some(ProofValue::Segments(
                segments.iter().map(|s| BASE64.encode(s)).collect(),
            )),
            nonce: Some(nonce.to_base64()),
            domain: Some(domain),
            extra: input.extra,
        };
        Ok(DerivedCredential {
            document: framed,
            proof: derived,
            metadata,
        })
    }

    /// Verify a derived proof attached to `signed`.
    ///
    /// # Errors
    ///
    /// See [`BbsProofSuite::verify`].
    pub fn verify_proof(
        &self,
        signed: &Value,
        purpose: &dyn ProofPurposeCheck,
        resolver: &dyn DocumentResolver,
    ) -> Result<VerificationResult, VcError> {
        let (document, proof) = split_proof(signed)?;
        self.verify(&document, &proof, purpose, resolver)
    }

    /// Verify a derived proof over a disclosed document.
    ///
    /// Malformed proof fields, an engine rejection and a purpose failure all
    /// yield `verified: false` with the reason.
    ///
    /// # Errors
    ///
    /// - `UnsupportedProofType` unless `proof` is a `BbsBlsSignatureProof2020`.
    /// - `Canonicalization` if the document or proof fails to canonicalize.
    /// - `VerificationMethodNotFound` or `VerificationMethodRevoked` if the
    ///   issuer key is unavailable.
    pub fn verify(
        &self,
        document: &Value,
        proof: &Value,
        purpose: &dyn ProofPurposeCheck,
        resolver: &dyn DocumentResolver,
    ) -> Result<VerificationResult, VcError> {
        let derived = Proof::from_value(proof)?;
        if derived.kind() != Some(ProofType::BbsBlsSignatureProof2020) {
            return Err(VcError::UnsupportedProofType(derived.proof_type));
        }
        let method = resolve_verification_method(&derived.verification_method, resolver)?;

        let transport = match decode_transport(&derived) {
            Ok(transport) => transport,
            Err(e) => {
                warn!(method = %method.id, error = %e, "derived proof is malformed");
                return Ok(VerificationResult::rejected(e));
            }
        };

        let proof_segment: Vec<Statement> = proof_statements(
            self.canonicalizer.as_ref(),
            proof,
            document,
            Some(ProofType::BbsBlsSignature2020),
            resolver,
        )?
        .into_iter()
        .filter(|s| s.predicate().as_deref() != Some(SECURITY_DOMAIN))
        .collect();
        let document_segment = from_synthetic_iris(&self.canonicalizer.canonicalize(document, resolver)?)?;
        let statements: Vec<Statement> = proof_segment.into_iter().chain(document_segment).collect();
        let messages = assemble(&statements, &[]);
        debug!(
            messages = messages.len(),
            revealed = transport.metadata.revealed.len(),
            ranges = transport.metadata.ranges.len(),
            "rebuilt revealed messages"
        );

        if messages.len() != transport.metadata.revealed.len() {
            warn!(
                messages = messages.len(),
                revealed = transport.metadata.revealed.len(),
                "revealed message count does not match proof metadata"
            );
            return Ok(VerificationResult::rejected(VcError::MetadataCorrupt(format!(
                "{} revealed messages but {} revealed indices",
                messages.len(),
                transport.metadata.revealed.len()
            ))));
        }

        let requests: Vec<VerifyRequest<'_>> = transport
            .segments
            .iter()
            .map(|segment| VerifyRequest {
                proof: segment,
                public_key: &method.public_key,
                messages: &messages,
                nonce: transport.nonce.as_bytes(),
                revealed: &transport.metadata.revealed,
                equivalences: &[],
                ranges: &transport.metadata.ranges,
            })
            .collect();
        if !self.engine.verify_proof_multi(&requests) {
            warn!(method = %method.id, engine = self.engine.name(), "derived proof rejected by engine");
            return Ok(VerificationResult::rejected(VcError::EngineVerificationFailed));
        }

        if let Err(e) = purpose.validate(&derived, &method, resolver) {
            warn!(method = %method.id, error = %e, "proof purpose rejected");
            return Ok(VerificationResult::rejected(e));
        }
        info!(method = %method.id, "derived proof verified");
        Ok(VerificationResult::verified())
    }
}

/// The `@context` a derived proof carries: the input proof's own, else the
/// document's.
fn proof_context(input: &Proof, document: &Value) -> Option<Value> {
    input
        .context
        .clone()
        .or_else(|| document.get("@context").cloned())
}

/// Decoded transport fields of a derived proof.
struct Transport {
    segments: Vec<Vec<u8>>,
    nonce: Nonce,
    metadata: ProofMetadata,
}

fn decode_transport(proof: &Proof) -> Result<Transport, VcError> {
    let value = proof
        .proof_value
        .as_ref()
        .ok_or(VcError::MissingProofField("proofValue"))?;
    let segments = value
        .segments()
        .into_iter()
        .map(|segment| {
            BASE64.decode(segment).map_err(|e| VcError::InvalidEncoding {
                field: "proofValue",
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if segments.is_empty() {
        return Err(VcError::MissingProofField("proofValue"));
    }

    let nonce = proof
        .nonce
        .as_deref()
        .ok_or(VcError::MissingProofField("nonce"))
        .and_then(|raw| {
            Nonce::from_base64(raw).map_err(|e| VcError::InvalidEncoding {
                field: "nonce",
                reason: e.to_string(),
            })
        })?;

    let domain = proof
        .domain
        .as_deref()
        .ok_or(VcError::MissingProofField("domain"))?;
    let metadata = ProofMetadata::decode(domain)?;

    Ok(Transport {
        segments,
        nonce,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Fixture};
    use crate::purpose::AssertionProofPurpose;
    use serde_json::json;

    fn derive(fx: &Fixture, reveal: &Value) -> DerivedCredential {
        fx.proof_suite()
            .derive_proof(&fx.signed(), reveal, Some(fixtures::nonce()), &fx.resolver)
            .unwrap()
    }

    fn verify(fx: &Fixture, signed: &Value) -> VerificationResult {
        fx.proof_suite()
            .verify_proof(signed, &AssertionProofPurpose::new(), &fx.resolver)
            .unwrap()
    }

    #[test]
    fn derived_proof_verifies() {
        let fx = Fixture::new();
        let derived = derive(&fx, &fixtures::reveal_document());
        let signed = derived.into_signed_document().unwrap();
        let result = verify(&fx, &signed);
        assert!(result.verified, "{:?}", result.error);
    }

    #[test]
    fn proof_fields_are_carried_verbatim() {
        let fx = Fixture::new();
        let derived = derive(&fx, &fixtures::reveal_document());
        assert_eq!(derived.proof.proof_type, "BbsBlsSignatureProof2020");
        assert_eq!(derived.proof.created.as_deref(), Some(fixtures::CREATED));
        assert_eq!(derived.proof.verification_method.id(), Some(fixtures::KEY_ID));
        assert_eq!(derived.proof.proof_purpose, "assertionMethod");
        assert_eq!(derived.proof.nonce.as_deref(), Some(fixtures::nonce().to_base64().as_str()));
        assert!(matches!(derived.proof.proof_value, Some(ProofValue::Segments(ref s)) if s.len() == 1));
    }

    #[test]
    fn metadata_reveals_proof_statements_and_bounds_age() {
        let fx = Fixture::new();
        let derived = derive(&fx, &fixtures::reveal_document());
        let metadata = &derived.metadata;
        assert_eq!(&metadata.revealed[..4], &[0, 1, 2, 3]);
        assert_eq!(metadata.ranges.len(), 1);
        assert_eq!(metadata.ranges[0].min, 18);
        assert_eq!(metadata.ranges[0].max, 60);
        assert_eq!(ProofMetadata::decode(derived.proof.domain.as_deref().unwrap()).unwrap(), *metadata);
    }

    #[test]
    fn range_bound_value_is_not_disclosed() {
        let fx = Fixture::new();
        let derived = derive(&fx, &fixtures::reveal_document());
        let text = derived.document.to_string();
        assert!(text.contains("Alice"));
        assert!(!text.contains("vocab#age\""));
        assert!(!text.contains("02139"));
    }

    #[test]
    fn unsatisfied_range_fails_derivation() {
        let fx = Fixture::new();
        let mut reveal = fixtures::reveal_document();
        reveal["credentialSubject"]["age"] = json!("range-30-60");
        let err = fx
            .proof_suite()
            .derive_proof(&fx.signed(), &reveal, Some(fixtures::nonce()), &fx.resolver)
            .unwrap_err();
        assert!(matches!(err, VcError::Engine(_)), "{err}");
    }

    #[test]
    fn derive_rejects_derived_proofs() {
        let fx = Fixture::new();
        let derived = derive(&fx, &fixtures::reveal_document());
        let signed = derived.into_signed_document().unwrap();
        let err = fx
            .proof_suite()
            .derive_proof(&signed, &fixtures::reveal_document(), None, &fx.resolver)
            .unwrap_err();
        assert!(matches!(err, VcError::UnsupportedProofType(_)));
    }

    #[test]
    fn verify_rejects_base_signatures() {
        let fx = Fixture::new();
        let err = fx
            .proof_suite()
            .verify_proof(&fx.signed(), &AssertionProofPurpose::new(), &fx.resolver)
            .unwrap_err();
        assert!(matches!(err, VcError::UnsupportedProofType(_)));
    }

    #[test]
    fn corrupt_domain_verifies_false() {
        let fx = Fixture::new();
        let mut signed = derive(&fx, &fixtures::reveal_document())
            .into_signed_document()
            .unwrap();
        signed["proof"]["domain"] = json!("!!not base64!!");
        let result = verify(&fx, &signed);
        assert!(!result.verified);
        assert!(matches!(result.error, Some(VcError::MetadataCorrupt(_))));
    }

    #[test]
    fn swapped_nonce_verifies_false() {
        let fx = Fixture::new();
        let mut signed = derive(&fx, &fixtures::reveal_document())
            .into_signed_document()
            .unwrap();
        signed["proof"]["nonce"] = json!(BASE64.encode([9u8; 32]));
        let result = verify(&fx, &signed);
        assert!(!result.verified);
        assert!(matches!(result.error, Some(VcError::EngineVerificationFailed)));
    }

    #[test]
    fn generated_nonce_has_configured_length() {
        let fx = Fixture::new();
        let derived = fx
            .proof_suite()
            .derive_proof(&fx.signed(), &fixtures::reveal_document(), None, &fx.resolver)
            .unwrap();
        let nonce = Nonce::from_base64(derived.proof.nonce.as_deref().unwrap()).unwrap();
        assert_eq!(nonce.len(), SuiteConfig::default().nonce_len);
    }
}
