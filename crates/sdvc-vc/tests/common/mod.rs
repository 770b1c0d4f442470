//! Issuer, holder and verifier setup shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sdvc_core::StaticResolver;
use sdvc_vc::{BbsProofSuite, BbsSignatureSuite, SignatureOptions};
use sdvc_zkp::{KeyPair, MockProofEngine, Nonce, ProofEngine};
use serde_json::{json, Value};

pub const PERSON_CONTEXT: &str = "https://example.org/contexts/person/v1";
pub const ISSUER: &str = "did:example:issuer";
pub const KEY_ID: &str = "did:example:issuer#key-1";
pub const CREATED: &str = "2024-02-01T12:00:00Z";
pub const VOCAB: &str = "https://example.org/vocab#";

pub fn person_context() -> Value {
    parse(include_str!("../data/person-context.json"))
}

pub fn credential() -> Value {
    parse(include_str!("../data/credential.json"))
}

/// Discloses issuer, issuance date and name, and bounds age to [18, 60].
pub fn reveal_document() -> Value {
    parse(include_str!("../data/reveal.json"))
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).expect("test data is valid JSON")
}

pub fn method_document(key: &KeyPair) -> Value {
    json!({
        "id": KEY_ID,
        "type": "Bls12381G2Key2020",
        "controller": ISSUER,
        "publicKeyBase58": key.public_key().to_base58()
    })
}

pub fn controller_document(key: &KeyPair) -> Value {
    json!({
        "id": ISSUER,
        "assertionMethod": [KEY_ID],
        "verificationMethod": [method_document(key)]
    })
}

pub struct Harness {
    pub engine: Arc<MockProofEngine>,
    pub key: KeyPair,
    pub resolver: StaticResolver,
}

impl Harness {
    pub fn new() -> Self {
        let engine = Arc::new(MockProofEngine::new());
        let key = engine
            .key_pair_from_secret(b"integration-test-issuer-secret")
            .expect("key pair");
        let resolver = StaticResolver::with_builtin_contexts()
            .expect("builtin contexts")
            .with_document(PERSON_CONTEXT, person_context())
            .with_document(KEY_ID, method_document(&key))
            .with_document(ISSUER, controller_document(&key));
        Self { engine, key, resolver }
    }

    pub fn issuer(&self) -> BbsSignatureSuite {
        BbsSignatureSuite::new(self.engine.clone())
    }

    pub fn holder(&self) -> BbsProofSuite {
        BbsProofSuite::new(self.engine.clone())
    }

    pub fn sign(&self, credential: &Value) -> Value {
        self.issuer()
            .sign(
                credential,
                &self.key,
                &SignatureOptions::new(KEY_ID).with_created(CREATED),
                &self.resolver,
            )
            .expect("sign credential")
    }

    /// Sign the standard credential and derive with the standard pattern.
    pub fn derived(&self) -> Value {
        self.holder()
            .derive_proof(&self.sign(&credential()), &reveal_document(), Some(nonce()), &self.resolver)
            .expect("derive proof")
            .into_signed_document()
            .expect("attach derived proof")
    }
}

pub fn nonce() -> Nonce {
    Nonce::from_bytes(b"verifier-supplied-nonce-0001".to_vec())
}
