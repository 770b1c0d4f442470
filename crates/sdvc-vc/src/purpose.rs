//! # Proof Purpose Checks
//!
//! A proof only counts if its key was authorized for the stated purpose by
//! the key's controller. For `assertionMethod`, the controller document must
//! list the verification method among its `assertionMethod` entries.

use chrono::{DateTime, Duration, Utc};
use sdvc_core::DocumentResolver;
use serde_json::Value;

use crate::error::VcError;
use crate::proof::{Proof, ProofPurpose};
use crate::verification_method::VerificationMethod;

/// Validates the purpose of a proof once its signature checks out.
pub trait ProofPurposeCheck: Send + Sync {
    /// The purpose this check enforces.
    fn purpose(&self) -> ProofPurpose;

    /// Validate `proof`, signed by `method`.
    ///
    /// # Errors
    ///
    /// Returns [`VcError::InvalidProofPurpose`] describing the failure.
    fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        resolver: &dyn DocumentResolver,
    ) -> Result<(), VcError>;
}

/// Requires `proofPurpose: assertionMethod` and controller authorization.
#[derive(Debug, Clone, Default)]
pub struct AssertionProofPurpose {
    max_timestamp_delta: Option<Duration>,
    date: Option<DateTime<Utc>>,
}

impl AssertionProofPurpose {
    /// A check with no timestamp window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject proofs whose `created` is further than `delta` from the
    /// reference time.
    pub fn with_max_timestamp_delta(mut self, delta: Duration) -> Self {
        self.max_timestamp_delta = Some(delta);
        self
    }

    /// Use `date` instead of the current time as the reference time.
    pub fn at(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    fn check_timestamp(&self, proof: &Proof) -> Result<(), VcError> {
        let Some(delta) = self.max_timestamp_delta else {
            return Ok(());
        };
        let created = proof
            .created_at()
            .map_err(|e| invalid(e.to_string()))?
            .ok_or_else(|| invalid("proof has no created time"))?;
        let reference = self.date.unwrap_or_else(Utc::now);
        if reference - created > delta || created - reference > delta {
            return Err(invalid(format!(
                "proof created at {created} is outside the allowed window of {}s",
                delta.num_seconds()
            )));
        }
        Ok(())
    }
}

impl ProofPurposeCheck for AssertionProofPurpose {
    fn purpose(&self) -> ProofPurpose {
        ProofPurpose::AssertionMethod
    }

    fn validate(
        &self,
        proof: &Proof,
        method: &VerificationMethod,
        resolver: &dyn DocumentResolver,
    ) -> Result<(), VcError> {
        if proof.purpose() != Some(ProofPurpose::AssertionMethod) {
            return Err(invalid(format!(
                "proof purpose {} is not assertionMethod",
                proof.proof_purpose
            )));
        }
        self.check_timestamp(proof)?;

        let controller_id = method
            .controller
            .as_deref()
            .ok_or_else(|| invalid(format!("verification method {} has no controller", method.id)))?;
        let controller = resolver
            .resolve(controller_id)
            .map_err(|e| invalid(format!("controller {controller_id} could not be resolved: {e}")))?;

        let authorized = controller
            .get("assertionMethod")
            .map(entries)
            .unwrap_or_default()
            .into_iter()
            .any(|entry| entry == method.id || relative_match(entry, controller_id, &method.id));
        if !authorized {
            return Err(invalid(format!(
                "verification method {} is not authorized for assertionMethod by {controller_id}",
                method.id
            )));
        }
        Ok(())
    }
}

fn entries(value: &Value) -> Vec<&str> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            _ => None,
        })
        .collect()
}

fn relative_match(entry: &str, controller: &str, method_id: &str) -> bool {
    entry.starts_with('#') && format!("{controller}{entry}") == method_id
}

fn invalid(reason: impl Into<String>) -> VcError {
    VcError::InvalidProofPurpose(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdvc_core::StaticResolver;
    use sdvc_zkp::PublicKey;
    use serde_json::json;

    const KEY: &str = "did:example:issuer#key-1";

    fn method() -> VerificationMethod {
        VerificationMethod {
            id: KEY.to_string(),
            controller: Some("did:example:issuer".to_string()),
            method_type: None,
            public_key: PublicKey::from_bytes(vec![1u8; 32]),
        }
    }

    fn proof(purpose: &str) -> Proof {
        Proof::from_value(&json!({
            "type": "BbsBlsSignatureProof2020",
            "created": "2024-01-01T00:00:00Z",
            "verificationMethod": KEY,
            "proofPurpose": purpose
        }))
        .unwrap()
    }

    fn resolver(assertion: Value) -> StaticResolver {
        StaticResolver::new().with_document(
            "did:example:issuer",
            json!({ "id": "did:example:issuer", "assertionMethod": assertion }),
        )
    }

    #[test]
    fn authorized_method_passes() {
        let check = AssertionProofPurpose::new();
        assert!(check.validate(&proof("assertionMethod"), &method(), &resolver(json!([KEY]))).is_ok());
        assert!(check
            .validate(&proof("assertionMethod"), &method(), &resolver(json!(["#key-1"])))
            .is_ok());
        assert!(check
            .validate(&proof("assertionMethod"), &method(), &resolver(json!([{ "id": KEY }])))
            .is_ok());
    }

    #[test]
    fn wrong_purpose_fails() {
        let err = AssertionProofPurpose::new()
            .validate(&proof("authentication"), &method(), &resolver(json!([KEY])))
            .unwrap_err();
        assert!(matches!(err, VcError::InvalidProofPurpose(_)));
    }

    #[test]
    fn unauthorized_method_fails() {
        let err = AssertionProofPurpose::new()
            .validate(&proof("assertionMethod"), &method(), &resolver(json!(["did:example:issuer#key-2"])))
            .unwrap_err();
        assert!(format!("{err}").contains("not authorized"));
    }

    #[test]
    fn unresolvable_controller_fails() {
        let err = AssertionProofPurpose::new()
            .validate(&proof("assertionMethod"), &method(), &StaticResolver::new())
            .unwrap_err();
        assert!(matches!(err, VcError::InvalidProofPurpose(_)));
    }

    #[test]
    fn timestamp_window() {
        let created: DateTime<Utc> = "2024-01-01T00:00:00Z".parse().unwrap();
        let check = AssertionProofPurpose::new()
            .with_max_timestamp_delta(Duration::minutes(5))
            .at(created + Duration::minutes(3));
        assert!(check.validate(&proof("assertionMethod"), &method(), &resolver(json!([KEY]))).is_ok());

        let late = check.at(created + Duration::hours(1));
        assert!(late.validate(&proof("assertionMethod"), &method(), &resolver(json!([KEY]))).is_err());
    }
}
