// src/tasklog/recovery.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::errors::{AgentError, Result};
use crate::exec::process_group::ProcessControl;
use crate::tasklog::TaskLog;

/// What a recovery pass actually did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub killed: Vec<i32>,
    pub removed: Vec<PathBuf>,
    /// Cleanup commands run, in invocation order.
    pub commands: Vec<String>,
    /// Individual kills or deletions that failed and were skipped.
    pub failures: usize,
}

/// Removes the log when recovery ends, however it ends.
struct RemoveOnExit<'a>(&'a Path);

impl Drop for RemoveOnExit<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.0) {
            Ok(()) => debug!(path = ?self.0, "removed task log"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.0, error = %e, "could not remove task log"),
        }
    }
}

impl TaskLog {
    /// Kill or clean up everything still marked as started, then delete the
    /// log.
    ///
    /// Best effort: an unreadable log, a failed kill or a failed deletion is
    /// logged and skipped. A failing cleanup command aborts the pass and is
    /// returned as an error.
    pub fn clean_up_all(&self, control: &dyn ProcessControl) -> Result<RecoveryReport> {
        let _remove = RemoveOnExit(self.path());
        let mut report = RecoveryReport::default();

        let liveness = match self.replay() {
            Ok(l) => l,
            Err(AgentError::IoError(e)) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path(), "no task log; nothing to recover");
                return Ok(report);
            }
            Err(e) => {
                error!(path = ?self.path(), pid = std::process::id(), error = %e, "cannot open task log");
                return Ok(report);
            }
        };

        let plan = liveness.plan();

        for pgid in plan.kill {
            info!(pid = pgid, "killing orphaned process group");
            match control.kill_group(pgid) {
                Ok(()) => report.killed.push(pgid),
                Err(e) => {
                    debug!(pid = pgid, error = %e, "kill failed; skipping");
                    report.failures += 1;
                }
            }
        }

        for path in plan.remove {
            info!(path = ?path, "deleting stale file");
            match control.remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) => {
                    debug!(path = ?path, error = %e, "delete failed; skipping");
                    report.failures += 1;
                }
            }
        }

        for (command, pids) in plan.batches {
            info!(command = %command, count = pids.len(), "running cleanup command");
            control.run_cleanup(&command, &pids)?;
            report.commands.push(command);
        }

        Ok(report)
    }
}
