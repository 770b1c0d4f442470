//! # Verification Method Lookup
//!
//! Resolves a proof's `verificationMethod` to the issuer public key.
//!
//! The IRI is resolved directly first. A DID URL with a fragment that is
//! not registered on its own is looked up inside its controller document
//! (`verificationMethod`, `publicKey`, `assertionMethod`, `authentication`
//! entries). A method carrying a `revoked` field is never used.

use sdvc_core::{DocumentResolver, ResolverError};
use sdvc_zkp::PublicKey;
use serde_json::{Map, Value};

use crate::error::VcError;
use crate::proof::VerificationMethodRef;

const METHOD_SECTIONS: &[&str] = &["verificationMethod", "publicKey", "assertionMethod", "authentication"];

/// A resolved key document.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationMethod {
    /// The method IRI.
    pub id: String,
    /// The controller IRI, if known.
    pub controller: Option<String>,
    /// The method type, e.g. `Bls12381G2Key2020`.
    pub method_type: Option<String>,
    /// The issuer public key.
    pub public_key: PublicKey,
}

/// Resolve `reference` to a verification method.
///
/// # Errors
///
/// - `MissingProofField("verificationMethod")` if the reference has no id.
/// - `VerificationMethodNotFound` if neither the IRI nor its controller
///   document yields the method.
/// - `VerificationMethodRevoked` if the method is revoked.
/// - `InvalidEncoding` if `publicKeyBase58` is absent or not base58.
pub fn resolve_verification_method(
    reference: &VerificationMethodRef,
    resolver: &dyn DocumentResolver,
) -> Result<VerificationMethod, VcError> {
    let id = reference
        .id()
        .ok_or(VcError::MissingProofField("verificationMethod"))?;

    let document = match resolver.resolve(id) {
        Ok(Value::Object(doc)) => doc,
        Ok(_) => return Err(VcError::VerificationMethodNotFound(id.to_string())),
        Err(ResolverError::NotFound(_)) => {
            find_in_controller(id, resolver)?.ok_or_else(|| VcError::VerificationMethodNotFound(id.to_string()))?
        }
        Err(e) => return Err(e.into()),
    };

    if document.contains_key("revoked") {
        tracing::warn!(method = %id, "verification method is revoked");
        return Err(VcError::VerificationMethodRevoked(id.to_string()));
    }

    let encoded = document
        .get("publicKeyBase58")
        .and_then(Value::as_str)
        .ok_or_else(|| VcError::InvalidEncoding {
            field: "publicKeyBase58",
            reason: format!("verification method {id} has no publicKeyBase58"),
        })?;
    let public_key = PublicKey::from_base58(encoded).map_err(|e| VcError::InvalidEncoding {
        field: "publicKeyBase58",
        reason: e.to_string(),
    })?;

    let controller = document
        .get("controller")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| id.split_once('#').map(|(base, _)| base.to_string()));

    Ok(VerificationMethod {
        id: id.to_string(),
        controller,
        method_type: document.get("type").and_then(Value::as_str).map(str::to_string),
        public_key,
    })
}

fn find_in_controller(
    id: &str,
    resolver: &dyn DocumentResolver,
) -> Result<Option<Map<String, Value>>, VcError> {
    let Some((base, fragment)) = id.split_once('#') else {
        return Ok(None);
    };
    let controller = match resolver.resolve(base) {
        Ok(doc) => doc,
        Err(ResolverError::NotFound(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let relative = format!("#{fragment}");
    for section in METHOD_SECTIONS {
        let Some(Value::Array(entries)) = controller.get(*section) else {
            continue;
        };
        for entry in entries {
            let Value::Object(method) = entry else { continue };
            let entry_id = method.get("id").and_then(Value::as_str);
            if entry_id == Some(id) || entry_id == Some(relative.as_str()) {
                return Ok(Some(method.clone()));
            }
        }
    }
    Ok(None)
}
