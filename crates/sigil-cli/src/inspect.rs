//! # Inspect Subcommand
//!
//! Prints a summary of a head: identity, window and segment counts, the
//! stored roots next to freshly recomputed ones, and the current head hash.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use sigil_ledger::history::current_window_root;
use sigil_ledger::{head, HeadState};

use crate::files::read_head;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Head document to inspect.
    pub head: PathBuf,

    /// Print machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadSummary {
    pub pulse: u64,
    pub chakra_day: String,
    pub kai_signature: String,
    pub owner_key: String,
    pub window_len: usize,
    pub open_transfer: bool,
    pub hardened_len: usize,
    pub segments: usize,
    pub sealed_transfers: u64,
    pub cumulative_transfers: u64,
    pub head_hash: String,
    pub transfers_window_root: Option<String>,
    pub recomputed_window_root: String,
    pub segments_merkle_root: Option<String>,
    pub recomputed_segments_root: Option<String>,
    pub branch_base_phi: Option<String>,
    pub branch_spent_phi: Option<String>,
}

impl HeadSummary {
    pub fn of(state: &HeadState) -> Result<Self> {
        let head_hash = head::compute(state, None).context("head hash")?;
        let window_root = current_window_root(state).context("window root")?;
        let recomputed_segments_root =
            (!state.segments.is_empty()).then(|| head::segments_root(&state.segments).to_string());
        Ok(Self {
            pulse: state.pulse,
            chakra_day: state.chakra_day.clone(),
            kai_signature: state.kai_signature.clone(),
            owner_key: state.owner_key().to_string(),
            window_len: state.transfers.len(),
            open_transfer: state.transfers.last().is_some_and(|t| !t.is_closed()),
            hardened_len: state.hardened_transfers.len(),
            segments: state.segments.len(),
            sealed_transfers: head::sum_segments(state),
            cumulative_transfers: state.cumulative_transfers,
            head_hash: head_hash.to_string(),
            transfers_window_root: state.transfers_window_root.as_ref().map(|h| h.to_string()),
            recomputed_window_root: window_root.to_string(),
            segments_merkle_root: state.segments_merkle_root.as_ref().map(|h| h.to_string()),
            recomputed_segments_root,
            branch_base_phi: state.branch_base_phi.clone(),
            branch_spent_phi: state.branch_spent_phi.clone(),
        })
    }

    pub fn window_root_ok(&self) -> bool {
        match &self.transfers_window_root {
            Some(stored) => *stored == self.recomputed_window_root,
            None => self.window_len == 0,
        }
    }

    pub fn segments_root_ok(&self) -> bool {
        self.segments_merkle_root == self.recomputed_segments_root
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "MISMATCH"
    }
}

pub fn run_inspect(args: &InspectArgs) -> Result<u8> {
    let state = read_head(&args.head)?;
    let summary = HeadSummary::of(&state)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(0);
    }

    let none = "-";
    println!("pulse:               {}", summary.pulse);
    println!("chakra day:          {}", summary.chakra_day);
    println!("kai signature:       {}", summary.kai_signature);
    println!("owner key:           {}", summary.owner_key);
    println!(
        "window:              {} transfer(s){}",
        summary.window_len,
        if summary.open_transfer { ", last open" } else { "" }
    );
    println!("hardened:            {}", summary.hardened_len);
    println!(
        "segments:            {} ({} transfer(s) sealed)",
        summary.segments, summary.sealed_transfers
    );
    println!("cumulative:          {}", summary.cumulative_transfers);
    println!("head hash:           {}", summary.head_hash);
    println!(
        "window root:         {} [{}]",
        summary.transfers_window_root.as_deref().unwrap_or(none),
        mark(summary.window_root_ok())
    );
    println!(
        "segments root:       {} [{}]",
        summary.segments_merkle_root.as_deref().unwrap_or(none),
        mark(summary.segments_root_ok())
    );
    if summary.branch_base_phi.is_some() || summary.branch_spent_phi.is_some() {
        println!(
            "branch:              base {} spent {}",
            summary.branch_base_phi.as_deref().unwrap_or(none),
            summary.branch_spent_phi.as_deref().unwrap_or(none)
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::signed_chain;
    use sigil_ledger::Ledger;

    #[test]
    fn summary_of_signed_chain() {
        let state = signed_chain(2);
        let s = HeadSummary::of(&state).unwrap();
        assert_eq!(s.window_len, 2);
        assert_eq!(s.hardened_len, 2);
        assert!(!s.open_transfer);
        assert!(s.window_root_ok());
        assert!(s.segments_root_ok());
        assert_eq!(s.recomputed_segments_root, None);
    }

    #[test]
    fn stale_window_root_is_flagged() {
        let mut state = signed_chain(2);
        state.transfers.pop();
        let s = HeadSummary::of(&state).unwrap();
        assert!(!s.window_root_ok());
    }

    #[test]
    fn sealed_head_reports_segments() {
        let mut ledger = Ledger::new(signed_chain(3));
        ledger.seal().unwrap().unwrap();
        let s = HeadSummary::of(ledger.head()).unwrap();
        assert_eq!(s.segments, 1);
        assert_eq!(s.sealed_transfers, 3);
        assert!(s.segments_root_ok());
        assert_eq!(
            s.head_hash,
            head::compute(ledger.head(), None).unwrap().to_string()
        );
    }
}
