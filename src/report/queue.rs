// src/report/queue.rs

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Transport for report messages.
pub trait MessageQueue: Send {
    fn send(&mut self, body: &str) -> Result<()>;
}

/// Appends each message as one line to a spool file that a shipper
/// process forwards to the real queue.
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    path: PathBuf,
}

impl SpoolQueue {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MessageQueue for SpoolQueue {
    fn send(&mut self, body: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening spool {:?}", self.path))?;
        file.write_all(format!("{body}\n").as_bytes())
            .with_context(|| format!("appending to spool {:?}", self.path))?;
        Ok(())
    }
}
