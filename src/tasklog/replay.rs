// src/tasklog/replay.rs

//! Replaying task log entries into a liveness map and an orphan plan.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::tasklog::entry::{Marker, TaskLogEntry};
use crate::types::CMD_REMOVE_FILE;

/// Which recorded process groups are still live after a replay.
#[derive(Debug, Default, Clone)]
pub struct Liveness {
    live: BTreeSet<String>,
    /// Cleanup annotations are remembered per pid even across a `-` entry,
    /// so a restarted pid keeps its teardown command.
    cleanup: HashMap<String, String>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = TaskLogEntry>,
    {
        let mut liveness = Self::new();
        for entry in entries {
            liveness.apply(entry);
        }
        liveness
    }

    pub fn apply(&mut self, entry: TaskLogEntry) {
        match entry.marker {
            Marker::Finished => {
                self.live.remove(&entry.pid);
            }
            Marker::Started => {
                if let Some(cmd) = entry.cleanup {
                    self.cleanup.insert(entry.pid.clone(), cmd);
                }
                self.live.insert(entry.pid);
            }
        }
    }

    pub fn is_live(&self, pid: &str) -> bool {
        self.live.contains(pid)
    }

    pub fn live_pids(&self) -> impl Iterator<Item = &str> {
        self.live.iter().map(String::as_str)
    }

    /// Decide what to do with every live pid.
    pub fn plan(&self) -> RecoveryPlan {
        let mut plan = RecoveryPlan::default();

        for pid in &self.live {
            match self.cleanup.get(pid).map(String::as_str) {
                None => match pid.parse::<i32>() {
                    // 0 and 1 would address our own group and init.
                    Ok(n) if n > 1 => plan.kill.push(n),
                    _ => {
                        warn!(pid = %pid, "not a killable process group id; skipping");
                        plan.skipped.push(pid.clone());
                    }
                },
                Some(CMD_REMOVE_FILE) => plan.remove.push(PathBuf::from(pid)),
                Some(cmd) => plan
                    .batches
                    .entry(cmd.to_string())
                    .or_default()
                    .push(pid.clone()),
            }
        }

        debug!(?plan, "recovery plan");
        plan
    }
}

/// Actions derived from a replayed task log.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    /// Process groups to SIGHUP directly.
    pub kill: Vec<i32>,
    /// Stale files to delete.
    pub remove: Vec<PathBuf>,
    /// Cleanup command → pids to pass to it, one invocation per command.
    pub batches: BTreeMap<String, Vec<String>>,
    /// Live entries that could not be acted on.
    pub skipped: Vec<String>,
}

impl RecoveryPlan {
    pub fn is_empty(&self) -> bool {
        self.kill.is_empty() && self.remove.is_empty() && self.batches.is_empty()
    }
}
