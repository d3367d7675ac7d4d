//! # sigil CLI
//!
//! Entry point for the `sigil` binary.
//!
//! ```bash
//! sigil keygen --store ~/.sigil/keypair.json
//! sigil verify head.json --json
//! sigil seal head.json --out-dir archive/
//! sigil inspect head.json
//! sigil prove head.json --index 3
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sigil_cli::inspect::{run_inspect, InspectArgs};
use sigil_cli::keygen::{run_keygen, KeygenArgs};
use sigil_cli::prove::{run_prove, ProveArgs};
use sigil_cli::seal::{run_seal, SealArgs};
use sigil_cli::verify::{run_verify, VerifyArgs};

/// Sigil provenance ledger tooling.
#[derive(Parser, Debug)]
#[command(name = "sigil", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load or create the device keypair.
    Keygen(KeygenArgs),
    /// Verify a head document offline.
    Verify(VerifyArgs),
    /// Seal the live window into a segment file.
    Seal(SealArgs),
    /// Summarize a head document.
    Inspect(InspectArgs),
    /// Emit an inclusion bundle for one transfer.
    Prove(ProveArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Verify(args) => run_verify(args).await,
        Commands::Seal(args) => run_seal(args),
        Commands::Inspect(args) => run_inspect(args),
        Commands::Prove(args) => run_prove(args),
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

    #[test]
    fn parses_verify_with_flags() {
        let cli = Cli::try_parse_from([
            "sigil", "verify", "head.json", "--vkey", "vk.json", "--json", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Verify(args) => {
                assert_eq!(args.head.to_str(), Some("head.json"));
                assert_eq!(args.vkey.unwrap().to_str(), Some("vk.json"));
                assert!(args.json);
                assert!(!args.mock_zk);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_prove_with_segment() {
        let cli = Cli::try_parse_from([
            "sigil",
            "prove",
            "head.json",
            "--index",
            "4",
            "--segment",
            "segment_0.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Prove(args) => {
                assert_eq!(args.index, 4);
                assert!(args.segment.is_some());
                assert!(args.out.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn prove_requires_index() {
        assert!(Cli::try_parse_from(["sigil", "prove", "head.json"]).is_err());
    }

    #[test]
    fn parses_seal_and_keygen() {
        let cli =
            Cli::try_parse_from(["sigil", "seal", "head.json", "--out-dir", "archive"]).unwrap();
        assert!(matches!(cli.command, Commands::Seal(ref a) if a.out_dir.is_some()));

        let cli = Cli::try_parse_from(["sigil", "--json-logs", "keygen"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Keygen(ref a) if a.store.is_none()));
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["sigil"]).is_err());
    }
}
