use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flowguard::errors::{AgentError, Result};
use flowguard::exec::ProcessControl;

#[derive(Debug, Default)]
struct Recorded {
    killed_groups: Vec<i32>,
    own_group_kills: usize,
    removed: Vec<PathBuf>,
    commands: Vec<(String, Vec<String>)>,
    failing_kills: HashSet<i32>,
    failing_commands: HashSet<String>,
}

/// A [`ProcessControl`] that signals nothing and records every call.
///
/// `remove_file` really deletes, since the paths live in temp dirs owned by
/// the test.
#[derive(Debug, Clone, Default)]
pub struct RecordingControl {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `kill_group(pgid)` fail with ESRCH.
    pub fn fail_kill(self, pgid: i32) -> Self {
        self.inner.lock().unwrap().failing_kills.insert(pgid);
        self
    }

    /// Make `run_cleanup(command, ..)` fail.
    pub fn fail_command(self, command: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing_commands
            .insert(command.to_string());
        self
    }

    pub fn killed_groups(&self) -> Vec<i32> {
        self.inner.lock().unwrap().killed_groups.clone()
    }

    pub fn own_group_kills(&self) -> usize {
        self.inner.lock().unwrap().own_group_kills
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().removed.clone()
    }

    pub fn commands(&self) -> Vec<(String, Vec<String>)> {
        self.inner.lock().unwrap().commands.clone()
    }
}

impl ProcessControl for RecordingControl {
    fn kill_group(&self, pgid: i32) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_kills.contains(&pgid) {
            return Err(AgentError::Signal(nix::errno::Errno::ESRCH));
        }
        inner.killed_groups.push(pgid);
        Ok(())
    }

    fn kill_own_group(&self) -> Result<()> {
        self.inner.lock().unwrap().own_group_kills += 1;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path)?;
        self.inner.lock().unwrap().removed.push(path.to_path_buf());
        Ok(())
    }

    fn run_cleanup(&self, command: &str, pids: &[String]) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push((command.to_string(), pids.to_vec()));
        if inner.failing_commands.contains(command) {
            return Err(AgentError::CleanupCommand {
                command: command.to_string(),
                reason: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}
