//! # Seal Subcommand
//!
//! Archives the closed part of the live window into a segment file and
//! rewrites the head. A window with nothing to seal leaves both untouched.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sigil_ledger::Ledger;

use crate::files::{parent_dir, read_head, write_json};

#[derive(Args, Debug)]
pub struct SealArgs {
    /// Head document to seal. Rewritten in place unless --out-dir is given.
    pub head: PathBuf,

    /// Directory for the updated head and the segment file. Defaults to the
    /// head's own directory.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

pub fn segment_file_name(index: u64) -> String {
    format!("segment_{index}.json")
}

pub fn run_seal(args: &SealArgs) -> Result<u8> {
    let mut ledger = Ledger::new(read_head(&args.head)?);
    let Some(sealed) = ledger.seal().context("seal failed")? else {
        println!("nothing to seal");
        return Ok(0);
    };

    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| parent_dir(&args.head));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let index = sealed.segment_file.segment_index;
    let segment_path = out_dir.join(segment_file_name(index));
    write_json(&segment_path, &sealed.segment_file)?;

    let head_path = match &args.out_dir {
        Some(dir) => dir.join(
            args.head
                .file_name()
                .context("head path has no file name")?,
        ),
        None => args.head.clone(),
    };
    write_json(&head_path, ledger.head())?;

    tracing::info!(
        segment = index,
        count = sealed.segment_file.transfers.len(),
        cid = %sealed.cid,
        "segment written"
    );
    println!("sealed segment {index}: {} transfer(s)", sealed.segment_file.transfers.len());
    println!("  cid:  {}", sealed.cid);
    println!("  file: {}", segment_path.display());
    println!("  head: {}", head_path.display());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::signed_chain;
    use sigil_ledger::{segment_file_matches, SegmentFile};

    #[test]
    fn seal_writes_segment_and_head() {
        let dir = tempfile::tempdir().unwrap();
        let head_path = dir.path().join("head.json");
        write_json(&head_path, &signed_chain(3)).unwrap();
        let out = dir.path().join("out");

        let args = SealArgs {
            head: head_path.clone(),
            out_dir: Some(out.clone()),
        };
        assert_eq!(run_seal(&args).unwrap(), 0);

        let sealed_head = read_head(&out.join("head.json")).unwrap();
        assert!(sealed_head.transfers.is_empty());
        assert_eq!(sealed_head.cumulative_transfers, 3);

        let raw = std::fs::read_to_string(out.join("segment_0.json")).unwrap();
        let file: SegmentFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(file.transfers.len(), 3);
        assert!(segment_file_matches(&sealed_head, &file));

        // Input untouched when an output directory is given.
        assert_eq!(read_head(&head_path).unwrap().transfers.len(), 3);
    }

    #[test]
    fn empty_window_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let head_path = dir.path().join("head.json");
        write_json(&head_path, &signed_chain(0)).unwrap();
        let before = std::fs::read_to_string(&head_path).unwrap();

        let args = SealArgs {
            head: head_path.clone(),
            out_dir: None,
        };
        assert_eq!(run_seal(&args).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&head_path).unwrap(), before);
        assert!(!dir.path().join("segment_0.json").exists());
    }
}
