//! # Credential Documents
//!
//! Credentials are handled as JSON-LD values rather than a fixed struct:
//! `credentialSubject` is open-ended, and every field the issuer wrote must
//! survive canonicalization byte-for-byte. This module splits the proof off
//! a signed document, attaches one, and builds the proof-options document
//! that is canonicalized into the proof segment of the statement list.

use sdvc_core::{Canonicalizer, DocumentResolver, Statement};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::VcError;
use crate::proof::ProofType;

/// Separate a signed document into the unsigned document and its proof.
///
/// When `proof` is an array, the first entry with a recognised BBS+ type is
/// chosen; failing that, the first entry.
///
/// # Errors
///
/// Returns `InvalidDocument` if `signed` is not an object and
/// `MissingProofField("proof")` if it carries no proof.
pub fn split_proof(signed: &Value) -> Result<(Value, Value), VcError> {
    let obj = signed
        .as_object()
        .ok_or_else(|| VcError::InvalidDocument("signed document is not a JSON object".to_string()))?;
    let mut document = obj.clone();
    let proof = match document.remove("proof") {
        Some(Value::Array(proofs)) => select_proof(proofs).ok_or(VcError::MissingProofField("proof"))?,
        Some(proof @ Value::Object(_)) => proof,
        Some(other) => {
            return Err(VcError::InvalidDocument(format!("proof is not an object: {other}")))
        }
        None => return Err(VcError::MissingProofField("proof")),
    };
    Ok((Value::Object(document), proof))
}

fn select_proof(proofs: Vec<Value>) -> Option<Value> {
    let supported = proofs.iter().position(|p| {
        p.get("type")
            .and_then(Value::as_str)
            .and_then(ProofType::parse)
            .is_some()
    });
    proofs.into_iter().nth(supported.unwrap_or(0))
}

/// Attach `proof` to a copy of `document`, replacing any existing proof.
///
/// # Errors
///
/// Returns `InvalidDocument` if `document` is not an object.
pub fn attach_proof(document: &Value, proof: Value) -> Result<Value, VcError> {
    let mut obj = document
        .as_object()
        .cloned()
        .ok_or_else(|| VcError::InvalidDocument("document is not a JSON object".to_string()))?;
    obj.insert("proof".to_string(), proof);
    Ok(Value::Object(obj))
}

/// Give a credential a `urn:uuid:` identifier if it has none.
///
/// Returns the identifier the credential ends up with.
///
/// # Errors
///
/// Returns `InvalidDocument` if `document` is not an object.
pub fn assign_missing_id(document: &mut Value) -> Result<String, VcError> {
    let obj = document
        .as_object_mut()
        .ok_or_else(|| VcError::InvalidDocument("document is not a JSON object".to_string()))?;
    if let Some(id) = obj.get("id").or_else(|| obj.get("@id")).and_then(Value::as_str) {
        return Ok(id.to_string());
    }
    let id = format!("urn:uuid:{}", Uuid::new_v4());
    obj.insert("id".to_string(), Value::String(id.clone()));
    Ok(id)
}

/// Build the document whose statements form the proof segment.
///
/// `nonce`, `proofValue` and `domain` are removed, `type` is replaced by
/// `as_type` when given, and the document's `@context` is supplied when the
/// proof has none of its own.
pub fn proof_options(proof: &Value, document: &Value, as_type: Option<ProofType>) -> Value {
    let mut options: Map<String, Value> = proof.as_object().cloned().unwrap_or_default();
    for transient in ["nonce", "proofValue", "domain"] {
        options.remove(transient);
    }
    if let Some(ty) = as_type {
        options.insert("type".to_string(), Value::String(ty.as_str().to_string()));
    }
    if !options.contains_key("@context") {
        if let Some(ctx) = document.get("@context") {
            options.insert("@context".to_string(), ctx.clone());
        }
    }
    Value::Object(options)
}

/// Canonicalize proof options into proof-segment statements.
pub(crate) fn proof_statements(
    canonicalizer: &dyn Canonicalizer,
    proof: &Value,
    document: &Value,
    as_type: Option<ProofType>,
    resolver: &dyn DocumentResolver,
) -> Result<Vec<Statement>, VcError> {
    let options = proof_options(proof, document, as_type);
    Ok(canonicalizer.canonicalize(&options, resolver)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_and_attach_are_inverse() {
        let signed = json!({ "id": "urn:x", "proof": { "type": "BbsBlsSignature2020" } });
        let (document, proof) = split_proof(&signed).unwrap();
        assert!(document.get("proof").is_none());
        assert_eq!(proof["type"], "BbsBlsSignature2020");
        assert_eq!(attach_proof(&document, proof).unwrap(), signed);
    }

    #[test]
    fn proof_arrays_prefer_supported_types() {
        let signed = json!({
            "proof": [
                { "type": "Ed25519Signature2020" },
                { "type": "sec:BbsBlsSignature2020" }
            ]
        });
        let (_, proof) = split_proof(&signed).unwrap();
        assert_eq!(proof["type"], "sec:BbsBlsSignature2020");
    }

    #[test]
    fn missing_proof_is_reported() {
        let err = split_proof(&json!({ "id": "urn:x" })).unwrap_err();
        assert!(matches!(err, VcError::MissingProofField("proof")));
        let err = split_proof(&json!({ "proof": [] })).unwrap_err();
        assert!(matches!(err, VcError::MissingProofField("proof")));
    }

    #[test]
    fn options_drop_transport_fields_and_inherit_context() {
        let document = json!({ "@context": "https://example.org/ctx" });
        let proof = json!({
            "type": "BbsBlsSignatureProof2020",
            "nonce": "n",
            "proofValue": "p",
            "domain": "d",
            "created": "2024-01-01T00:00:00Z"
        });
        let options = proof_options(&proof, &document, Some(ProofType::BbsBlsSignature2020));
        assert_eq!(
            options,
            json!({
                "@context": "https://example.org/ctx",
                "type": "BbsBlsSignature2020",
                "created": "2024-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn own_context_wins() {
        let document = json!({ "@context": "https://example.org/doc" });
        let proof = json!({ "@context": "https://example.org/proof", "type": "BbsBlsSignature2020" });
        let options = proof_options(&proof, &document, None);
        assert_eq!(options["@context"], "https://example.org/proof");
    }

    #[test]
    fn ids_are_assigned_once() {
        let mut doc = json!({ "type": "VerifiableCredential" });
        let id = assign_missing_id(&mut doc).unwrap();
        assert!(id.starts_with("urn:uuid:"));
        assert_eq!(assign_missing_id(&mut doc).unwrap(), id);

        let mut doc = json!({ "id": "urn:fixed" });
        assert_eq!(assign_missing_id(&mut doc).unwrap(), "urn:fixed");
    }
}
