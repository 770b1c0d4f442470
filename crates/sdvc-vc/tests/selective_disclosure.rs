//! # Selective Disclosure End to End
//!
//! Issue a credential, derive proofs from it with reveal patterns, and
//! verify them, including every tampering a verifier must catch.

mod common;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::{credential, nonce, reveal_document, Harness, ISSUER, KEY_ID, VOCAB};
use sdvc_vc::{
    AssertionProofPurpose, BbsProofSuite, MetadataFormat, ProofMetadata, SuiteConfig, VcError,
    VerificationResult,
};
use serde_json::{json, Value};

fn verify(harness: &Harness, derived: &Value) -> VerificationResult {
    harness
        .holder()
        .verify_proof(derived, &AssertionProofPurpose::new(), &harness.resolver)
        .expect("verification should not raise")
}

// =========================================================================
// Issue → derive → verify
// =========================================================================

#[test]
fn issued_credential_verifies_after_derivation() {
    let harness = Harness::new();
    let signed = harness.sign(&credential());

    let base = harness
        .issuer()
        .verify_signature(&signed, &AssertionProofPurpose::new(), &harness.resolver)
        .expect("signature check");
    assert!(base.verified, "base signature: {:?}", base.error);

    let derived = harness.derived();
    assert_eq!(derived["proof"]["type"], "BbsBlsSignatureProof2020");
    let result = verify(&harness, &derived);
    assert!(result.verified, "derived proof: {:?}", result.error);
}

#[test]
fn derived_document_discloses_only_selected_claims() {
    let harness = Harness::new();
    let derived = harness.derived();
    let text = derived.to_string();

    assert!(text.contains("Alice"));
    assert!(text.contains(ISSUER));
    assert!(text.contains("2024-01-01T00:00:00Z"));
    assert!(!text.contains("02139"), "zip must stay hidden");
    assert!(!text.contains("Cambridge"), "address must stay hidden");
    assert!(!text.contains(&format!("{VOCAB}age\"")), "age is range-proven, not revealed");
}

#[test]
fn metadata_reveals_proof_segment_and_bounds_age() {
    let harness = Harness::new();
    let derived = harness.derived();
    let metadata = ProofMetadata::decode(derived["proof"]["domain"].as_str().expect("domain"))
        .expect("metadata decodes");

    // Proof segment: type, created, proofPurpose, verificationMethod.
    assert_eq!(&metadata.revealed[..4], &[0, 1, 2, 3]);
    assert!(metadata.revealed[4..].iter().all(|&i| i >= 4 && i < 15));

    // 4 proof + 11 document statements; the single integer is injected at 15.
    assert_eq!(metadata.ranges.len(), 1);
    let triple = metadata.ranges[0];
    assert_eq!((triple.message_index, triple.min, triple.max), (15, 18, 60));
}

#[test]
fn legacy_metadata_layout_still_verifies() {
    let harness = Harness::new();
    let holder = BbsProofSuite::new(harness.engine.clone()).with_config(SuiteConfig {
        metadata_format: MetadataFormat::Legacy,
        ..SuiteConfig::default()
    });
    let derived = holder
        .derive_proof(&harness.sign(&credential()), &reveal_document(), Some(nonce()), &harness.resolver)
        .expect("derive")
        .into_signed_document()
        .expect("attach");
    let words = BASE64
        .decode(derived["proof"]["domain"].as_str().expect("domain"))
        .expect("base64");
    assert_eq!(words.len() % 4, 0);
    assert!(verify(&harness, &derived).verified);
}

#[test]
fn revealing_a_blank_node_round_trips() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["address"] = json!({});
    let derived = harness
        .holder()
        .derive_proof(&harness.sign(&credential()), &reveal, Some(nonce()), &harness.resolver)
        .expect("derive with address")
        .into_signed_document()
        .expect("attach");

    let text = derived.to_string();
    assert!(text.contains("Cambridge"));
    assert!(text.contains("urn:bnid:_:c14n"));
    let result = verify(&harness, &derived);
    assert!(result.verified, "{:?}", result.error);
}

#[test]
fn fresh_nonces_give_distinct_proofs_that_both_verify() {
    let harness = Harness::new();
    let signed = harness.sign(&credential());
    let derive = || {
        harness
            .holder()
            .derive_proof(&signed, &reveal_document(), None, &harness.resolver)
            .expect("derive")
            .into_signed_document()
            .expect("attach")
    };
    let (a, b) = (derive(), derive());
    assert_ne!(a["proof"]["nonce"], b["proof"]["nonce"]);
    assert_ne!(a["proof"]["proofValue"], b["proof"]["proofValue"]);
    assert!(verify(&harness, &a).verified);
    assert!(verify(&harness, &b).verified);
}

// =========================================================================
// Derivation refusals
// =========================================================================

#[test]
fn claiming_an_unsigned_value_is_a_reveal_mismatch() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["name"] = json!("Mallory");
    let err = harness
        .holder()
        .derive_proof(&harness.sign(&credential()), &reveal, Some(nonce()), &harness.resolver)
        .unwrap_err();
    match err {
        VcError::RevealMismatch { statement } => assert!(statement.contains("Mallory")),
        other => panic!("expected RevealMismatch, got {other}"),
    }
}

fn derive_error(harness: &Harness, reveal: &Value) -> VcError {
    harness
        .holder()
        .derive_proof(&harness.sign(&credential()), reveal, Some(nonce()), &harness.resolver)
        .expect_err("derivation should be refused")
}

#[test]
fn requesting_a_field_the_issuer_never_signed_is_a_reveal_mismatch() {
    let harness = Harness::new();

    // `ageGroup` is defined by the context but absent from the credential.
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["ageGroup"] = json!({});
    match derive_error(&harness, &reveal) {
        VcError::RevealMismatch { statement } => {
            assert!(statement.starts_with("<did:example:alice>"), "{statement}");
            assert!(statement.contains(&format!("{VOCAB}ageGroup")), "{statement}");
        }
        other => panic!("expected RevealMismatch, got {other}"),
    }

    // `nickname` maps to no predicate at all.
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["nickname"] = json!({});
    match derive_error(&harness, &reveal) {
        VcError::RevealMismatch { statement } => assert!(statement.contains("nickname")),
        other => panic!("expected RevealMismatch, got {other}"),
    }
}

#[test]
fn excluding_an_absent_field_is_allowed() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["ageGroup"] = json!([]);
    let derived = harness
        .holder()
        .derive_proof(&harness.sign(&credential()), &reveal, Some(nonce()), &harness.resolver)
        .expect("derive");
    assert_eq!(derived.metadata.ranges.len(), 1);
}

#[test]
fn range_on_an_absent_field_is_refused() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["age"] = json!({});
    reveal["credentialSubject"]["ageGroup"] = json!("range-1-10");
    match derive_error(&harness, &reveal) {
        VcError::RevealMismatch { statement } => assert!(statement.contains("ageGroup")),
        other => panic!("expected RevealMismatch, got {other}"),
    }
}

#[test]
fn range_on_a_string_field_is_refused() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["name"] = json!("range-1-10");
    match derive_error(&harness, &reveal) {
        VcError::InvalidRangeSentinel { value, reason } => {
            assert_eq!(value, "range-1-10");
            assert!(reason.contains("name"), "{reason}");
        }
        other => panic!("expected InvalidRangeSentinel, got {other}"),
    }
}

#[test]
fn range_bounds_only_the_node_it_was_written_on() {
    let harness = Harness::new();
    let mut subject_credential = credential();
    subject_credential["credentialSubject"]["address"]["age"] = json!(70);
    let derived = harness
        .holder()
        .derive_proof(
            &harness.sign(&subject_credential),
            &reveal_document(),
            Some(nonce()),
            &harness.resolver,
        )
        .expect("address age must not be bound by the subject's range");

    // Both integers are injected, only the subject's age is constrained.
    assert_eq!(derived.metadata.ranges.len(), 1);
    let triple = derived.metadata.ranges[0];
    assert_eq!((triple.min, triple.max), (18, 60));

    let result = verify(&harness, &derived.into_signed_document().expect("attach"));
    assert!(result.verified, "{:?}", result.error);
}

#[test]
fn malformed_range_sentinel_is_rejected() {
    let harness = Harness::new();
    let mut reveal = reveal_document();
    reveal["credentialSubject"]["age"] = json!("range-60-18");
    let err = harness
        .holder()
        .derive_proof(&harness.sign(&credential()), &reveal, Some(nonce()), &harness.resolver)
        .unwrap_err();
    assert!(matches!(err, VcError::InvalidRangeSentinel { .. }), "{err}");
}

// =========================================================================
// Tampering
// =========================================================================

#[test]
fn every_proof_byte_is_load_bearing() {
    let harness = Harness::new();
    let derived = harness.derived();
    let segment = derived["proof"]["proofValue"][0].as_str().expect("segment").to_string();
    let bytes = BASE64.decode(&segment).expect("base64");

    for i in 0..bytes.len() {
        let mut tampered_bytes = bytes.clone();
        tampered_bytes[i] ^= 0x01;
        let mut tampered = derived.clone();
        tampered["proof"]["proofValue"] = json!([BASE64.encode(&tampered_bytes)]);
        assert!(!verify(&harness, &tampered).verified, "flipping byte {i} went unnoticed");
    }
}

#[test]
fn altered_disclosed_claim_fails() {
    let harness = Harness::new();
    let derived = harness.derived();
    let tampered: Value =
        serde_json::from_str(&derived.to_string().replace("Alice", "Alicia")).expect("json");
    let result = verify(&harness, &tampered);
    assert!(!result.verified);
    assert!(matches!(result.error, Some(VcError::EngineVerificationFailed)));
}

#[test]
fn widened_range_fails() {
    let harness = Harness::new();
    let mut derived = harness.derived();
    let mut metadata = ProofMetadata::decode(derived["proof"]["domain"].as_str().expect("domain"))
        .expect("decode");
    metadata.ranges[0].max = 61;
    derived["proof"]["domain"] = json!(metadata.encode(MetadataFormat::Versioned).expect("encode"));
    assert!(!verify(&harness, &derived).verified);
}

#[test]
fn dropped_revealed_index_is_reported_as_corrupt() {
    let harness = Harness::new();
    let mut derived = harness.derived();
    let mut metadata = ProofMetadata::decode(derived["proof"]["domain"].as_str().expect("domain"))
        .expect("decode");
    metadata.revealed.pop();
    derived["proof"]["domain"] = json!(metadata.encode(MetadataFormat::Versioned).expect("encode"));
    let result = verify(&harness, &derived);
    assert!(!result.verified);
    assert!(matches!(result.error, Some(VcError::MetadataCorrupt(_))));
}

#[test]
fn garbage_segment_among_valid_ones_fails() {
    let harness = Harness::new();
    let mut derived = harness.derived();
    let segment = derived["proof"]["proofValue"][0].clone();
    derived["proof"]["proofValue"] = json!([segment, "AAAA"]);
    assert!(!verify(&harness, &derived).verified);
}

// =========================================================================
// Keys and purpose
// =========================================================================

#[test]
fn unauthorized_key_fails_purpose() {
    let mut harness = Harness::new();
    harness
        .resolver
        .insert(ISSUER, json!({ "id": ISSUER, "assertionMethod": [] }));
    let result = verify(&harness, &harness.derived());
    assert!(!result.verified);
    assert!(matches!(result.error, Some(VcError::InvalidProofPurpose(_))));
}

#[test]
fn unknown_key_is_an_error() {
    let harness = Harness::new();
    let derived = harness.derived();
    let mut stranger = Harness::new();
    stranger.resolver = sdvc_core::StaticResolver::with_builtin_contexts()
        .expect("contexts")
        .with_document(common::PERSON_CONTEXT, common::person_context());
    let err = stranger
        .holder()
        .verify_proof(&derived, &AssertionProofPurpose::new(), &stranger.resolver)
        .unwrap_err();
    assert!(matches!(err, VcError::VerificationMethodNotFound(id) if id == KEY_ID));
}

#[test]
fn revoked_key_is_an_error() {
    let mut harness = Harness::new();
    let derived = harness.derived();
    let mut method = common::method_document(&harness.key);
    method["revoked"] = json!("2024-03-01T00:00:00Z");
    harness.resolver.insert(KEY_ID, method);
    let err = harness
        .holder()
        .verify_proof(&derived, &AssertionProofPurpose::new(), &harness.resolver)
        .unwrap_err();
    assert!(matches!(err, VcError::VerificationMethodRevoked(_)));
}

#[test]
fn unsupported_proof_type_is_an_error() {
    let harness = Harness::new();
    let mut derived = harness.derived();
    derived["proof"]["type"] = json!("Ed25519Signature2020");
    let err = harness
        .holder()
        .verify_proof(&derived, &AssertionProofPurpose::new(), &harness.resolver)
        .unwrap_err();
    assert!(matches!(err, VcError::UnsupportedProofType(t) if t == "Ed25519Signature2020"));
}
