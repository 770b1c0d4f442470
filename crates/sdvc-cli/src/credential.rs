//! # Issue, Derive and Verify Subcommands
//!
//! Thin wrappers over [`BbsSignatureSuite`] and [`BbsProofSuite`]. Suite
//! configuration comes from the `SDVC_*` environment variables.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use sdvc_vc::{
    assign_missing_id, split_proof, AssertionProofPurpose, BbsProofSuite, BbsSignatureSuite,
    ProofType, SignatureOptions, SuiteConfig, VerificationResult,
};
use sdvc_zkp::{Nonce, ProofEngine};
use serde_json::Value;

use crate::documents::load_resolver;
use crate::keys::load_key_pair;
use crate::{read_json, write_json};

/// Exit code of a proof that does not verify.
pub const EXIT_NOT_VERIFIED: u8 = 2;

/// Arguments for `sdvc issue`.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Unsigned credential (JSON-LD).
    pub credential: PathBuf,

    /// Issuer key file from `sdvc keygen`.
    #[arg(long)]
    pub key: PathBuf,

    /// Verification method IRI written into the proof.
    #[arg(long)]
    pub verification_method: String,

    /// Proof creation time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub created: Option<String>,

    /// JSON files mapping IRI to context or DID document.
    #[arg(long = "documents", num_args = 1..)]
    pub documents: Vec<PathBuf>,

    /// Write the signed credential here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `sdvc derive`.
#[derive(Args, Debug)]
pub struct DeriveArgs {
    /// Credential signed with `BbsBlsSignature2020`.
    pub signed: PathBuf,

    /// Reveal pattern (JSON-LD frame).
    #[arg(long)]
    pub reveal: PathBuf,

    /// Verifier-supplied nonce, base64. Generated when absent.
    #[arg(long)]
    pub nonce: Option<String>,

    /// JSON files mapping IRI to context or DID document.
    #[arg(long = "documents", num_args = 1..)]
    pub documents: Vec<PathBuf>,

    /// Write the derived credential here instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

/// Arguments for `sdvc verify`.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Signed or derived credential.
    pub document: PathBuf,

    /// JSON files mapping IRI to context or DID document.
    #[arg(long = "documents", num_args = 1..)]
    pub documents: Vec<PathBuf>,
}

/// Execute `sdvc issue`.
pub fn run_issue(args: &IssueArgs, engine: Arc<dyn ProofEngine>) -> Result<u8> {
    let resolver = load_resolver(&args.documents)?;
    let key = load_key_pair(&args.key, engine.as_ref())?;
    let mut credential = read_json(&args.credential)?;
    let id = assign_missing_id(&mut credential)?;

    let mut options = SignatureOptions::new(args.verification_method.clone());
    options.created = args.created.clone();
    let signed = BbsSignatureSuite::new(engine)
        .sign(&credential, &key, &options, &resolver)
        .context("signing failed")?;
    tracing::info!(credential = %id, method = %args.verification_method, "issued credential");

    write_json(&signed, args.out.as_deref())?;
    Ok(0)
}

/// Execute `sdvc derive`.
pub fn run_derive(args: &DeriveArgs, engine: Arc<dyn ProofEngine>) -> Result<u8> {
    let config = SuiteConfig::from_env()?;
    let resolver = load_resolver(&args.documents)?;
    let signed = read_json(&args.signed)?;
    let reveal = read_json(&args.reveal)?;
    let nonce = args
        .nonce
        .as_deref()
        .map(Nonce::from_base64)
        .transpose()
        .context("--nonce is not base64")?;

    let derived = BbsProofSuite::new(engine)
        .with_config(config)
        .derive_proof(&signed, &reveal, nonce, &resolver)
        .context("derivation failed")?;
    tracing::info!(
        revealed = derived.metadata.revealed.len(),
        ranges = derived.metadata.ranges.len(),
        "derived proof"
    );

    write_json(&derived.into_signed_document()?, args.out.as_deref())?;
    Ok(0)
}

/// Execute `sdvc verify`. Returns 0 when the proof verifies and
/// [`EXIT_NOT_VERIFIED`] when it does not.
pub fn run_verify(args: &VerifyArgs, engine: Arc<dyn ProofEngine>) -> Result<u8> {
    let resolver = load_resolver(&args.documents)?;
    let document = read_json(&args.document)?;
    let purpose = AssertionProofPurpose::new();

    let result = match proof_type(&document)? {
        ProofType::BbsBlsSignature2020 => {
            BbsSignatureSuite::new(engine).verify_signature(&document, &purpose, &resolver)?
        }
        ProofType::BbsBlsSignatureProof2020 => BbsProofSuite::new(engine)
            .with_config(SuiteConfig::from_env()?)
            .verify_proof(&document, &purpose, &resolver)?,
    };
    Ok(report(&result))
}

fn proof_type(document: &Value) -> Result<ProofType> {
    let (_, proof) = split_proof(document)?;
    let raw = proof.get("type").and_then(Value::as_str).unwrap_or_default();
    match ProofType::parse(raw) {
        Some(kind) => Ok(kind),
        None => bail!("unsupported proof type: {raw:?}"),
    }
}

fn report(result: &VerificationResult) -> u8 {
    if result.verified {
        println!("verified");
        return 0;
    }
    match &result.error {
        Some(e) => println!("not verified: {e}"),
        None => println!("not verified"),
    }
    EXIT_NOT_VERIFIED
}
