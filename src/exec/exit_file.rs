// src/exec/exit_file.rs

use std::fs;

use anyhow::Context;
use tracing::debug;

use crate::errors::Result;
use crate::types::is_capture_path;

/// Overwrite `path` with the raw outcome string.
///
/// No-op when `path` is empty or `-`.
pub fn record_exit(path: &str, outcome: &str) -> Result<()> {
    if !is_capture_path(path) {
        return Ok(());
    }

    debug!(path = %path, outcome = %outcome, "writing exit file");
    fs::write(path, outcome).with_context(|| format!("writing exit file {path:?}"))?;
    Ok(())
}
