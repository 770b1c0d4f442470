//! # Proof Types
//!
//! The proof objects carried by selective-disclosure credentials:
//!
//! - **BbsBlsSignature2020**: the issuer's base signature over every
//!   statement of the credential.
//! - **BbsBlsSignatureProof2020**: a holder-derived proof disclosing a
//!   subset of those statements.
//!
//! Proof types are recognised in three spellings: the bare term, the
//! `sec:` compact IRI, and the full security-vocabulary IRI.
//!
//! ## Security Invariant
//!
//! `created`, `verificationMethod`, `proofPurpose` and any additional proof
//! fields are signed as proof statements. A derived proof copies them
//! verbatim; they are never reformatted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::VcError;

/// Security vocabulary namespace.
pub const SECURITY_VOCAB: &str = "https://w3id.org/security#";

/// Predicate of the derived proof's metadata carrier field.
pub const SECURITY_DOMAIN: &str = "https://w3id.org/security#domain";

/// The proof types this crate produces and consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProofType {
    /// Issuer base signature.
    BbsBlsSignature2020,
    /// Holder-derived selective-disclosure proof.
    BbsBlsSignatureProof2020,
}

impl ProofType {
    /// Recognise a proof type in any of its accepted spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let local = value
            .strip_prefix("sec:")
            .or_else(|| value.strip_prefix(SECURITY_VOCAB))
            .unwrap_or(value);
        match local {
            "BbsBlsSignature2020" => Some(ProofType::BbsBlsSignature2020),
            "BbsBlsSignatureProof2020" => Some(ProofType::BbsBlsSignatureProof2020),
            _ => None,
        }
    }

    /// The bare term.
    pub fn as_str(self) -> &'static str {
        match self {
            ProofType::BbsBlsSignature2020 => "BbsBlsSignature2020",
            ProofType::BbsBlsSignatureProof2020 => "BbsBlsSignatureProof2020",
        }
    }
}

impl fmt::Display for ProofType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The purpose of a proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProofPurpose {
    /// The issuer asserts the credential claims are true.
    AssertionMethod,
    /// Authentication of the proof creator.
    Authentication,
}

impl ProofPurpose {
    /// Recognise a purpose as a term, compact IRI, or full IRI.
    pub fn parse(value: &str) -> Option<Self> {
        let local = value
            .strip_prefix("sec:")
            .or_else(|| value.strip_prefix(SECURITY_VOCAB))
            .unwrap_or(value);
        match local {
            "assertionMethod" => Some(ProofPurpose::AssertionMethod),
            "authentication" | "authenticationMethod" => Some(ProofPurpose::Authentication),
            _ => None,
        }
    }

    /// The term as written in proofs.
    pub fn as_str(self) -> &'static str {
        match self {
            ProofPurpose::AssertionMethod => "assertionMethod",
            ProofPurpose::Authentication => "authentication",
        }
    }
}

impl fmt::Display for ProofPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `verificationMethod`: an IRI, or an embedded object with an `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VerificationMethodRef {
    /// A key IRI, usually a DID URL.
    Iri(String),
    /// An embedded method object.
    Embedded(Map<String, Value>),
}

impl VerificationMethodRef {
    /// The method IRI.
    pub fn id(&self) -> Option<&str> {
        match self {
            VerificationMethodRef::Iri(iri) => Some(iri),
            VerificationMethodRef::Embedded(obj) => obj
                .get("id")
                .or_else(|| obj.get("@id"))
                .and_then(Value::as_str),
        }
    }
}

/// `proofValue`: one base64 string, or one segment per proof in multi mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofValue {
    /// A single base64 value.
    Single(String),
    /// Base64 segments.
    Segments(Vec<String>),
}

impl ProofValue {
    /// All segments in order.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            ProofValue::Single(value) => vec![value.as_str()],
            ProofValue::Segments(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// A proof attached to a credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Contexts the proof was canonicalized with, when carried explicitly.
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// The proof type as written.
    #[serde(rename = "type")]
    pub proof_type: String,

    /// Creation time, kept verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,

    /// The signing key.
    #[serde(rename = "verificationMethod")]
    pub verification_method: VerificationMethodRef,

    /// The proof purpose as written.
    #[serde(rename = "proofPurpose")]
    pub proof_purpose: String,

    /// Signature or proof bytes, base64.
    #[serde(rename = "proofValue", default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<ProofValue>,

    /// Derived-proof nonce, base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Derived-proof metadata blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Any other proof fields, carried through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Proof {
    /// Read a proof object.
    ///
    /// # Errors
    ///
    /// Returns `MissingProofField` for an absent `type`,
    /// `verificationMethod` or `proofPurpose`, and `Json` for other shape
    /// errors.
    pub fn from_value(value: &Value) -> Result<Self, VcError> {
        let obj = value
            .as_object()
            .ok_or_else(|| VcError::InvalidDocument(format!("proof is not an object: {value}")))?;
        for field in ["type", "verificationMethod", "proofPurpose"] {
            if !obj.contains_key(field) {
                return Err(VcError::MissingProofField(field));
            }
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Serialize to a JSON object.
    pub fn to_value(&self) -> Result<Value, VcError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The recognised proof type, if any.
    pub fn kind(&self) -> Option<ProofType> {
        ProofType::parse(&self.proof_type)
    }

    /// The recognised proof purpose, if any.
    pub fn purpose(&self) -> Option<ProofPurpose> {
        ProofPurpose::parse(&self.proof_purpose)
    }

    /// Parse `created` as an RFC 3339 timestamp.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEncoding` if `created` is present but not RFC 3339.
    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>, VcError> {
        self.created
            .as_deref()
            .map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| VcError::InvalidEncoding {
                        field: "created",
                        reason: e.to_string(),
                    })
            })
            .transpose()
    }
}
