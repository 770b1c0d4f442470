//! Shared test credential, keys and resolver.
//!
//! The credential, its context and the reveal pattern live in
//! `tests/data/` and are shared with the integration tests.

use std::sync::Arc;

use sdvc_core::StaticResolver;
use sdvc_zkp::{KeyPair, MockProofEngine, Nonce, ProofEngine};
use serde_json::{json, Value};

use crate::signature::{BbsSignatureSuite, SignatureOptions};
use crate::suite::BbsProofSuite;

pub const PERSON_CONTEXT: &str = "https://example.org/contexts/person/v1";
pub const ISSUER: &str = "did:example:issuer";
pub const KEY_ID: &str = "did:example:issuer#key-1";
pub const CREATED: &str = "2024-02-01T12:00:00Z";

pub fn person_context() -> Value {
    parse(include_str!("../tests/data/person-context.json"))
}

pub fn credential() -> Value {
    parse(include_str!("../tests/data/credential.json"))
}

pub fn reveal_document() -> Value {
    parse(include_str!("../tests/data/reveal.json"))
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

pub fn nonce() -> Nonce {
    Nonce::from_bytes(vec![0x42; 32])
}

pub struct Fixture {
    pub engine: Arc<MockProofEngine>,
    pub key: KeyPair,
    pub resolver: StaticResolver,
}

impl Fixture {
    pub fn new() -> Self {
        let engine = Arc::new(MockProofEngine::new());
        let key = engine.key_pair_from_secret(&[7u8; 32]).unwrap();
        let method = json!({
            "id": KEY_ID,
            "type": "Bls12381G2Key2020",
            "controller": ISSUER,
            "publicKeyBase58": key.public_key().to_base58()
        });
        let resolver = StaticResolver::with_builtin_contexts()
            .unwrap()
            .with_document(PERSON_CONTEXT, person_context())
            .with_document(KEY_ID, method.clone())
            .with_document(
                ISSUER,
                json!({
                    "id": ISSUER,
                    "assertionMethod": [KEY_ID],
                    "verificationMethod": [method]
                }),
            );
        Self { engine, key, resolver }
    }

    pub fn signature_suite(&self) -> BbsSignatureSuite {
        BbsSignatureSuite::new(self.engine.clone())
    }

    pub fn proof_suite(&self) -> BbsProofSuite {
        BbsProofSuite::new(self.engine.clone())
    }

    pub fn signed(&self) -> Value {
        self.signature_suite()
            .sign(
                &credential(),
                &self.key,
                &SignatureOptions::new(KEY_ID).with_created(CREATED),
                &self.resolver,
            )
            .unwrap()
    }
}
