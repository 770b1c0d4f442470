//! # sdvc CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sdvc_zkp::{MockProofEngine, ProofEngine};
use tracing_subscriber::EnvFilter;

use sdvc_cli::credential::{run_derive, run_issue, run_verify, DeriveArgs, IssueArgs, VerifyArgs};
use sdvc_cli::keys::{run_keygen, KeygenArgs};

/// Selective-disclosure credentials with BBS+ signatures.
///
/// Issues credentials, derives proofs that reveal only selected claims and
/// prove hidden integers lie in a range, and verifies them.
#[derive(Parser, Debug)]
#[command(name = "sdvc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an issuer key pair.
    Keygen(KeygenArgs),

    /// Sign a credential with BbsBlsSignature2020.
    Issue(IssueArgs),

    /// Derive a selective-disclosure proof from a signed credential.
    Derive(DeriveArgs),

    /// Verify a signed or derived credential.
    Verify(VerifyArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let engine: Arc<dyn ProofEngine> = Arc::new(MockProofEngine::new());
    tracing::debug!(engine = engine.name(), "sdvc starting");

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args, engine.as_ref()),
        Commands::Issue(args) => run_issue(&args, engine),
        Commands::Derive(args) => run_derive(&args, engine),
        Commands::Verify(args) => run_verify(&args, engine),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_keygen() {
        let cli = Cli::try_parse_from(["sdvc", "keygen", "--out", "key.json"]).unwrap();
        match cli.command {
            Commands::Keygen(args) => assert_eq!(args.out, Some(PathBuf::from("key.json"))),
            other => panic!("expected keygen, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_issue_with_documents() {
        let cli = Cli::try_parse_from([
            "sdvc",
            "issue",
            "cred.json",
            "--key",
            "key.json",
            "--verification-method",
            "did:example:issuer#key-1",
            "--documents",
            "a.json",
            "b.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Issue(args) => {
                assert_eq!(args.credential, PathBuf::from("cred.json"));
                assert_eq!(args.verification_method, "did:example:issuer#key-1");
                assert_eq!(args.documents.len(), 2);
            }
            other => panic!("expected issue, got {other:?}"),
        }
    }

    #[test]
    fn cli_parse_derive_requires_reveal() {
        assert!(Cli::try_parse_from(["sdvc", "derive", "signed.json"]).is_err());
        let cli = Cli::try_parse_from(["sdvc", "-vv", "derive", "signed.json", "--reveal", "r.json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Derive(_)));
    }

    #[test]
    fn cli_parse_verify() {
        let cli = Cli::try_parse_from(["sdvc", "verify", "derived.json", "--json-logs"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Verify(_)));
    }
}
