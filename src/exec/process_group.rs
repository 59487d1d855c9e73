// src/exec/process_group.rs

//! Process-group isolation and the kill primitives.
//!
//! Everything that actually touches other processes goes through the
//! [`ProcessControl`] trait, so the supervisor and crash recovery can be
//! driven in tests without signalling anything real.

use std::path::Path;
use std::process::Command;

use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::{Pid, getpgid, setpgid};
use tracing::debug;

use crate::errors::{AgentError, Result};

/// Side effects used by the supervisor's kill path and by crash recovery.
pub trait ProcessControl: Send + Sync {
    /// Send SIGHUP to the process group `pgid`.
    fn kill_group(&self, pgid: i32) -> Result<()>;

    /// Send SIGHUP to the agent's own process group.
    ///
    /// The agent is part of that group; with the supervisor's handlers
    /// installed it survives, otherwise nothing after this call is
    /// guaranteed to run.
    fn kill_own_group(&self) -> Result<()>;

    /// Delete a stale file left by an unfinished task.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Run an external cleanup command once with `pids` as its arguments.
    fn run_cleanup(&self, command: &str, pids: &[String]) -> Result<()>;
}

/// Real implementation backed by `nix` and `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixProcessControl;

impl ProcessControl for UnixProcessControl {
    fn kill_group(&self, pgid: i32) -> Result<()> {
        kill_group(pgid)
    }

    fn kill_own_group(&self) -> Result<()> {
        debug!("sending SIGHUP to own process group");
        kill(Pid::from_raw(0), Signal::SIGHUP)?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn run_cleanup(&self, command: &str, pids: &[String]) -> Result<()> {
        // The annotation may carry its own flags, e.g. "scancel --full".
        let mut words = shlex::split(command)
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| vec![command.to_string()]);
        let program = words.remove(0);

        debug!(program = %program, args = ?words, pids = ?pids, "spawning cleanup command");
        let status = Command::new(&program)
            .args(&words)
            .args(pids)
            .status()
            .map_err(|e| AgentError::CleanupCommand {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(AgentError::CleanupCommand {
                command: command.to_string(),
                reason: status.to_string(),
            });
        }
        Ok(())
    }
}

/// Send SIGHUP to every process in group `pgid`.
pub fn kill_group(pgid: i32) -> Result<()> {
    debug!(pgid, "sending SIGHUP to process group");
    killpg(Pid::from_raw(pgid), Signal::SIGHUP)?;
    Ok(())
}

/// Move the agent into a brand-new process group.
///
/// A later kill of the agent's group then never reaches the parent that
/// spawned it. Under a remote shell this may be refused; the session is then
/// expected to propagate termination itself, so failure is only logged.
pub fn isolate_process_group() -> bool {
    let before = getpgid(None).ok();
    match setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        Ok(()) => {
            debug!(old_pgid = ?before, new_pgid = ?getpgid(None).ok(), "moved into new process group");
            true
        }
        Err(e) => {
            debug!(error = %e, "could not create a new process group");
            false
        }
    }
}
