//! Keygen → issue → derive → verify through the subcommand handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sdvc_cli::credential::{
    run_derive, run_issue, run_verify, DeriveArgs, IssueArgs, VerifyArgs, EXIT_NOT_VERIFIED,
};
use sdvc_cli::keys::{run_keygen, KeyFile, KeygenArgs};
use sdvc_cli::read_json;
use sdvc_zkp::{MockProofEngine, ProofEngine};
use serde_json::json;

const PERSON_CONTEXT: &str = "https://example.org/contexts/person/v1";
const ISSUER: &str = "did:example:issuer";
const KEY_ID: &str = "did:example:issuer#key-1";

fn engine() -> Arc<dyn ProofEngine> {
    Arc::new(MockProofEngine::new())
}

fn write(dir: &Path, name: &str, value: &serde_json::Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, value.to_string()).expect("write fixture");
    path
}

struct Workspace {
    _dir: tempfile::TempDir,
    root: PathBuf,
    key: PathBuf,
    documents: PathBuf,
}

fn workspace() -> Workspace {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_path_buf();
    let key = root.join("key.json");
    run_keygen(&KeygenArgs { secret: None, out: Some(key.clone()), method_id: None, method_out: None }, engine().as_ref()).expect("keygen");
    let key_file: KeyFile = serde_json::from_value(read_json(&key).expect("read key")).expect("key file");

    let method = json!({
        "id": KEY_ID,
        "type": "Bls12381G2Key2020",
        "controller": ISSUER,
        "publicKeyBase58": key_file.public_key_base58
    });
    let documents = write(
        &root,
        "documents.json",
        &json!({
            PERSON_CONTEXT: {
                "@context": {
                    "ex": "https://example.org/vocab#",
                    "Person": "ex:Person",
                    "name": "ex:name",
                    "age": { "@id": "ex:age", "@type": "http://www.w3.org/2001/XMLSchema#int" }
                }
            },
            KEY_ID: method,
            ISSUER: { "id": ISSUER, "assertionMethod": [KEY_ID] }
        }),
    );
    Workspace { _dir: dir, root, key, documents }
}

fn contexts() -> serde_json::Value {
    json!([
        "https://www.w3.org/2018/credentials/v1",
        "https://w3id.org/security/bbs/v1",
        PERSON_CONTEXT
    ])
}

#[test]
fn full_flow_verifies_and_tampering_exits_two() {
    let ws = workspace();
    let credential = write(
        &ws.root,
        "credential.json",
        &json!({
            "@context": contexts(),
            "type": ["VerifiableCredential"],
            "issuer": ISSUER,
            "issuanceDate": "2024-01-01T00:00:00Z",
            "credentialSubject": { "id": "did:example:bob", "type": "Person", "name": "Bob", "age": 41 }
        }),
    );
    let reveal = write(
        &ws.root,
        "reveal.json",
        &json!({
            "@context": contexts(),
            "type": "VerifiableCredential",
            "@explicit": true,
            "credentialSubject": { "@explicit": true, "type": "Person", "age": "range-18-65" }
        }),
    );
    let signed = ws.root.join("signed.json");
    let derived = ws.root.join("derived.json");

    let issue = IssueArgs {
        credential,
        key: ws.key.clone(),
        verification_method: KEY_ID.to_string(),
        created: Some("2024-02-01T12:00:00Z".to_string()),
        documents: vec![ws.documents.clone()],
        out: Some(signed.clone()),
    };
    assert_eq!(run_issue(&issue, engine()).expect("issue"), 0);
    let signed_doc = read_json(&signed).expect("signed");
    assert!(signed_doc["id"].as_str().expect("assigned id").starts_with("urn:uuid:"));

    let verify_signed = VerifyArgs { document: signed.clone(), documents: vec![ws.documents.clone()] };
    assert_eq!(run_verify(&verify_signed, engine()).expect("verify signed"), 0);

    let derive = DeriveArgs {
        signed,
        reveal,
        nonce: Some("bm9uY2Utbm9uY2Utbm9uY2U=".to_string()),
        documents: vec![ws.documents.clone()],
        out: Some(derived.clone()),
    };
    assert_eq!(run_derive(&derive, engine()).expect("derive"), 0);
    let derived_doc = read_json(&derived).expect("derived");
    assert!(!derived_doc.to_string().contains("Bob"));

    let verify_derived = VerifyArgs { document: derived.clone(), documents: vec![ws.documents.clone()] };
    assert_eq!(run_verify(&verify_derived, engine()).expect("verify derived"), 0);

    let mut tampered = derived_doc;
    tampered["proof"]["nonce"] = json!("b3RoZXItbm9uY2U=");
    let tampered_path = write(&ws.root, "tampered.json", &tampered);
    let verify_tampered = VerifyArgs { document: tampered_path, documents: vec![ws.documents.clone()] };
    assert_eq!(run_verify(&verify_tampered, engine()).expect("verify tampered"), EXIT_NOT_VERIFIED);
}

#[test]
fn verify_without_documents_is_an_error() {
    let ws = workspace();
    let document = write(
        &ws.root,
        "orphan.json",
        &json!({
            "@context": contexts(),
            "type": ["VerifiableCredential"],
            "proof": {
                "type": "BbsBlsSignatureProof2020",
                "verificationMethod": KEY_ID,
                "proofPurpose": "assertionMethod",
                "proofValue": ["AAAA"],
                "nonce": "AAAA",
                "domain": "AAAAAA=="
            }
        }),
    );
    let args = VerifyArgs { document, documents: Vec::new() };
    assert!(run_verify(&args, engine()).is_err());
}
