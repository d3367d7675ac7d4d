//! # Verify Subcommand
//!
//! Runs the offline verifier over a head document and reports the findings.
//! Exit code 0 when the chain verifies, 2 when it does not.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use sigil_verifier::{
    annotate_zk_verification, load_vkey, OfflineVerifier, VerificationConfig, VerifyReport,
};
use sigil_zkp::{MockProofBackend, ProofVerifierRegistry, ZkBridge, SCHEME_GROTH16};

use crate::files::{read_head, write_json};

/// Exit code for a head that parsed but failed verification.
pub const EXIT_UNVERIFIED: u8 = 2;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Head document to verify.
    pub head: PathBuf,

    /// Verifying key used when the head carries none inline. Overrides
    /// $SIGIL_ZK_VKEY_PATH.
    #[arg(long)]
    pub vkey: Option<PathBuf>,

    /// Print the full report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Register the deterministic mock Groth16 verifier. Development only.
    #[arg(long)]
    pub mock_zk: bool,

    /// Write a copy of the head with ZK stamp `verified` flags filled in.
    #[arg(long, value_name = "PATH")]
    pub annotate: Option<PathBuf>,
}

fn bridge(mock: bool) -> ZkBridge {
    let mut registry = ProofVerifierRegistry::new();
    if mock {
        registry.register(SCHEME_GROTH16, Arc::new(MockProofBackend::new()));
    }
    ZkBridge::from_registry(&registry)
}

fn config(args: &VerifyArgs) -> Result<VerificationConfig> {
    let config = VerificationConfig::from_env().context("invalid verifier configuration")?;
    match &args.vkey {
        Some(path) => Ok(config.with_fallback_vkey(load_vkey(path)?)),
        None => Ok(config),
    }
}

pub async fn run_verify(args: &VerifyArgs) -> Result<u8> {
    let head = read_head(&args.head)?;
    let verifier = OfflineVerifier::new(config(args)?, bridge(args.mock_zk));

    let report = verifier.verify(&head).await;
    tracing::info!(
        ok = report.ok,
        count = report.count,
        issues = report.issues.len(),
        "verification finished"
    );

    if let Some(out) = &args.annotate {
        let mut annotated = head.clone();
        let updated = annotate_zk_verification(
            &mut annotated,
            &bridge(args.mock_zk),
            verifier.config().fallback_vkey.as_ref(),
        );
        write_json(out, &annotated)?;
        tracing::info!(updated, path = %out.display(), "annotated head written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(if report.ok { 0 } else { EXIT_UNVERIFIED })
}

fn print_report(report: &VerifyReport) {
    if report.ok {
        println!("OK: {} hardened transfer(s) verified", report.count);
    } else {
        println!(
            "FAILED: {} issue(s) across {} hardened transfer(s)",
            report.issues.len(),
            report.count
        );
        for issue in &report.issues {
            println!("  - {issue}");
        }
    }
    for advisory in &report.advisories {
        println!("  note: {advisory}");
    }
}
