//! # sigil-cli — Command-Line Interface for the Sigil Ledger
//!
//! Each subcommand lives in its own module with a clap `Args` struct and a
//! `run_*` handler returning the process exit code. The binary in
//! `main.rs` only parses arguments, sets up tracing and dispatches.
//!
//! ## Subcommands
//!
//! - `keygen`: load or create the device keypair.
//! - `verify`: offline verification of a head document.
//! - `seal`: archive the live window into a segment file.
//! - `inspect`: head summary with recomputed roots.
//! - `prove`: inclusion bundle for a live or archived transfer.

pub mod files;
pub mod inspect;
pub mod keygen;
pub mod prove;
pub mod seal;
pub mod verify;
