// src/exec/readiness.rs

//! Readiness gate for generated scripts.
//!
//! Whoever generates a script appends a trailer line
//! `# Checksum: <hex>` holding a base-33 rolling hash of everything before
//! that line. Executing a script that is still being flushed fails with
//! "text file busy", so before launching one we poll until the trailer
//! matches the content.

use std::path::Path;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::config::Settings;

/// Trailer marker. The hash covers every byte before the newline that
/// starts the trailer line.
pub const CHECKSUM_MARKER: &[u8] = b"\n# Checksum: ";

/// `sum = sum * 33 + byte` over `bytes`, in wrapping `u32` arithmetic.
pub fn rolling_checksum(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |sum, &b| sum.wrapping_mul(33).wrapping_add(u32::from(b)))
}

/// Trailer to append to `body` so that [`verify_checksum`] accepts it.
pub fn checksum_trailer(body: &[u8]) -> String {
    format!(
        "{}{:x}\n",
        String::from_utf8_lossy(CHECKSUM_MARKER),
        rolling_checksum(body)
    )
}

/// Check a complete file image against its trailer.
///
/// Returns false when the marker is missing, the value is not valid hex, or
/// the hash does not match.
pub fn verify_checksum(contents: &[u8]) -> bool {
    let Some(idx) = contents
        .windows(CHECKSUM_MARKER.len())
        .rposition(|w| w == CHECKSUM_MARKER)
    else {
        return false;
    };

    let value = &contents[idx + CHECKSUM_MARKER.len()..];
    let Ok(value) = std::str::from_utf8(value) else {
        return false;
    };
    let Ok(expected) = u32::from_str_radix(value.trim(), 16) else {
        return false;
    };

    rolling_checksum(&contents[..idx]) == expected
}

/// True if `path` is an existing file starting with `#!`, i.e. a script that
/// was most likely generated for us and carries a trailer.
pub async fn looks_like_generated_script(path: &Path) -> bool {
    let Ok(mut file) = tokio::fs::File::open(path).await else {
        return false;
    };
    let mut head = [0u8; 2];
    matches!(file.read_exact(&mut head).await, Ok(_) if &head == b"#!")
}

/// Bounded polling of a script's checksum trailer.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    pub iterations: u32,
    pub interval: Duration,
}

impl ReadinessGate {
    pub fn new(iterations: u32, interval: Duration) -> Self {
        Self {
            iterations,
            interval,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.checksum_iterations, settings.checksum_sleep)
    }

    /// Poll `path` until its trailer matches.
    ///
    /// Returns true immediately when `disabled`. Returns false once the
    /// iteration budget is spent; callers treat that as advisory and launch
    /// anyway.
    pub async fn wait_until_ready(&self, path: &Path, disabled: bool) -> bool {
        if disabled {
            return true;
        }

        for i in 0..self.iterations {
            debug!(iteration = i, path = ?path, "checking script checksum");
            if let Ok(contents) = tokio::fs::read(path).await {
                if verify_checksum(&contents) {
                    return true;
                }
            }
            tokio::time::sleep(self.interval).await;
        }

        debug!(path = ?path, iterations = self.iterations, "checksum never matched");
        false
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}
