// src/tasklog/mod.rs

//! Durable task log and crash recovery.
//!
//! The root agent creates one log per run. Collaborators append a `+` line
//! when they start a process group and a `-` line when it finishes. If the
//! root is told to die (timeout or signal), it replays the log and tears
//! down everything still marked as started.
//!
//! - [`entry`] parses and formats single lines.
//! - [`replay`] turns entries into a liveness map and an orphan plan.
//! - [`recovery`] executes the plan.

pub mod entry;
pub mod recovery;
pub mod replay;

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::errors::Result;

pub use entry::{Marker, TaskLogEntry};
pub use recovery::RecoveryReport;
pub use replay::{Liveness, RecoveryPlan};

/// File name prefix of per-pid task logs.
pub const TASK_LOG_PREFIX: &str = "flowguard.pid.";

/// Deterministic task log location for agent `pid` under `dir`.
pub fn task_log_path(dir: &Path, pid: u32) -> PathBuf {
    dir.join(format!("{TASK_LOG_PREFIX}{pid}"))
}

/// Handle on a task log file.
///
/// A log created with [`TaskLog::create_for_pid`] is owned and deleted when
/// the handle drops (clean exit). [`TaskLog::open`] gives a non-owning
/// handle, used by collaborators that only append.
#[derive(Debug)]
pub struct TaskLog {
    path: PathBuf,
    owned: bool,
}

impl TaskLog {
    /// Create (truncate) the log for agent `pid` in `dir` and take ownership.
    pub fn create_for_pid(dir: &Path, pid: u32) -> Result<Self> {
        let path = task_log_path(dir, pid);
        File::create(&path).with_context(|| format!("creating task log {path:?}"))?;
        debug!(path = ?path, "created task log");
        Ok(Self { path, owned: true })
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a `+` entry, optionally annotated with a cleanup command.
    pub fn record_started(&self, pid: &str, cleanup: Option<&str>) -> Result<()> {
        self.append(&TaskLogEntry::started(pid, cleanup))
    }

    /// Append a `-` entry.
    pub fn record_finished(&self, pid: &str) -> Result<()> {
        self.append(&TaskLogEntry::finished(pid))
    }

    /// Append one entry as a single write, so concurrent appenders do not
    /// interleave within a line.
    pub fn append(&self, entry: &TaskLogEntry) -> Result<()> {
        let line = format!("{entry}\n");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening task log {:?} for append", self.path))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("appending to task log {:?}", self.path))?;
        Ok(())
    }

    /// Read every well-formed entry in file order.
    pub fn entries(&self) -> Result<Vec<TaskLogEntry>> {
        let file = File::open(&self.path)?;
        let mut entries = Vec::new();
        // Split on raw bytes: one undecodable line must not hide the rest.
        for (n, raw) in BufReader::new(file).split(b'\n').enumerate() {
            let raw = raw.with_context(|| format!("reading task log {:?}", self.path))?;
            let line = match std::str::from_utf8(&raw) {
                Ok(l) => l,
                Err(e) => {
                    warn!(line = n + 1, error = %e, "skipping task log line that is not UTF-8");
                    continue;
                }
            };
            match TaskLogEntry::parse(line) {
                Some(entry) => entries.push(entry),
                None if line.trim().is_empty() => {}
                None => warn!(line = n + 1, content = %line, "skipping malformed task log line"),
            }
        }
        Ok(entries)
    }

    pub fn replay(&self) -> Result<Liveness> {
        Ok(Liveness::from_entries(self.entries()?))
    }
}

impl Drop for TaskLog {
    fn drop(&mut self) {
        if self.owned {
            let _ = fs::remove_file(&self.path);
        }
    }
}
