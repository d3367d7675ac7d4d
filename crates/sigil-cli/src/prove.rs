//! # Prove Subcommand
//!
//! Emits an inclusion bundle for one transfer: from the live window by
//! default, or from an archived segment file with `--segment`. The bundle
//! is checked against the head before it is printed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sigil_ledger::{
    build_head_window_bundle, build_segment_bundle, segment_file_matches, verify_historical,
    ProofBundle, SegmentFile,
};

use crate::files::{read_head, write_json};

#[derive(Args, Debug)]
pub struct ProveArgs {
    /// Head document the bundle is anchored to.
    pub head: PathBuf,

    /// Transfer position within the live window, or within the segment.
    #[arg(long)]
    pub index: usize,

    /// Archived segment file holding the transfer.
    #[arg(long)]
    pub segment: Option<PathBuf>,

    /// Write the bundle here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

fn read_segment(path: &PathBuf) -> Result<SegmentFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read segment {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid segment {}", path.display()))
}

pub fn build_bundle(args: &ProveArgs) -> Result<ProofBundle> {
    let head = read_head(&args.head)?;
    let bundle = match &args.segment {
        Some(path) => {
            let file = read_segment(path)?;
            if !segment_file_matches(&head, &file) {
                tracing::warn!(
                    segment = file.segment_index,
                    "segment file does not match the head's record"
                );
            }
            ProofBundle::Segment(build_segment_bundle(&head, &file, args.index)?)
        }
        None => ProofBundle::Head(build_head_window_bundle(&head, args.index)?),
    };
    if !verify_historical(&head, &bundle) {
        tracing::warn!("bundle does not verify against the head's stored roots");
    }
    Ok(bundle)
}

pub fn run_prove(args: &ProveArgs) -> Result<u8> {
    let bundle = build_bundle(args)?;
    match &args.out {
        Some(path) => write_json(path, &bundle)?,
        None => println!("{}", serde_json::to_string_pretty(&bundle)?),
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal::{run_seal, SealArgs};
    use crate::testutil::signed_chain;

    #[test]
    fn head_window_bundle_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let head_path = dir.path().join("head.json");
        let state = signed_chain(3);
        write_json(&head_path, &state).unwrap();

        let args = ProveArgs {
            head: head_path,
            index: 1,
            segment: None,
            out: None,
        };
        let bundle = build_bundle(&args).unwrap();
        assert!(matches!(bundle, ProofBundle::Head(_)));
        assert!(verify_historical(&state, &bundle));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let head_path = dir.path().join("head.json");
        write_json(&head_path, &signed_chain(2)).unwrap();
        let args = ProveArgs {
            head: head_path,
            index: 5,
            segment: None,
            out: None,
        };
        assert!(run_prove(&args).is_err());
    }

    #[test]
    fn segment_bundle_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let head_path = dir.path().join("head.json");
        write_json(&head_path, &signed_chain(2)).unwrap();
        run_seal(&SealArgs {
            head: head_path.clone(),
            out_dir: None,
        })
        .unwrap();

        let out = dir.path().join("bundle.json");
        let args = ProveArgs {
            head: head_path.clone(),
            index: 0,
            segment: Some(dir.path().join("segment_0.json")),
            out: Some(out.clone()),
        };
        assert_eq!(run_prove(&args).unwrap(), 0);

        let raw = std::fs::read_to_string(&out).unwrap();
        let bundle: ProofBundle = serde_json::from_str(&raw).unwrap();
        assert!(verify_historical(&read_head(&head_path).unwrap(), &bundle));
    }
}
