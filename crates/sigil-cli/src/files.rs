//! File helpers shared by subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use sigil_ledger::HeadState;

/// Read and parse a head document.
pub fn read_head(path: &Path) -> Result<HeadState> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read head {}", path.display()))?;
    HeadState::from_json(&raw).with_context(|| format!("invalid head {}", path.display()))
}

/// Write `value` as pretty JSON with a trailing newline, via a temporary
/// file renamed into place.
pub fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value).context("failed to serialize JSON")?;
    body.push('\n');
    let tmp = tmp_path(path);
    std::fs::write(&tmp, body).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Directory containing `path`, or `.` for a bare file name.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
