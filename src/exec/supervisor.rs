// src/exec/supervisor.rs

//! Timeout / signal supervision of one child.
//!
//! A spawned task waits for the child and reports on a single-slot channel.
//! The supervisor then races that channel against the deadline and the
//! signal subscription; whichever fires first decides the [`Outcome`].
//!
//! Ordering on the kill path: exit file, then crash recovery (root only),
//! then SIGHUP to the agent's own process group. The reporter gets the exit
//! string last, once the output pumps have drained.

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::exec::exit_file::record_exit;
use crate::exec::launcher::Launched;
use crate::exec::process_group::ProcessControl;
use crate::exec::signals::SignalSubscription;
use crate::report::SharedReporter;
use crate::tasklog::TaskLog;
use crate::types::{OsSignal, Outcome};

/// Deadline used when no positive timeout was given: one year.
pub const UNBOUNDED_TIMEOUT: Duration = Duration::from_secs(31_536_000);

/// How long to wait for output pumps to drain after the child is gone.
pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Deadline for a timeout given in seconds.
pub fn timeout_from_secs(secs: i64) -> Duration {
    if secs <= 0 {
        UNBOUNDED_TIMEOUT
    } else {
        Duration::from_secs(secs as u64)
    }
}

/// Describe a non-successful wait status the way the exit file expects it.
pub fn describe_status(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        format!("exit status {code}")
    } else if let Some(sig) = status.signal() {
        format!("signal: {}", OsSignal::from_raw(sig))
    } else {
        status.to_string()
    }
}

/// Supervises exactly one launched child.
pub struct Supervisor {
    control: Arc<dyn ProcessControl>,
    timeout: Duration,
    exit_file: String,
    /// Present only on a root instance; replayed on the kill path.
    task_log: Option<TaskLog>,
    reporter: Option<SharedReporter>,
    drain_grace: Duration,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("timeout", &self.timeout)
            .field("exit_file", &self.exit_file)
            .field("task_log", &self.task_log)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(control: Arc<dyn ProcessControl>, timeout: Duration, exit_file: impl Into<String>) -> Self {
        Self {
            control,
            timeout,
            exit_file: exit_file.into(),
            task_log: None,
            reporter: None,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }

    /// Act as the root instance owning `task_log`.
    pub fn with_task_log(mut self, task_log: TaskLog) -> Self {
        self.task_log = Some(task_log);
        self
    }

    pub fn with_reporter(mut self, reporter: Option<SharedReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn is_root(&self) -> bool {
        self.task_log.is_some()
    }

    pub fn task_log(&self) -> Option<&TaskLog> {
        self.task_log.as_ref()
    }

    /// Wait for the child, enforce the deadline, react to signals, and
    /// record the outcome.
    pub async fn supervise(&self, launched: Launched, signals: &mut SignalSubscription) -> Outcome {
        let Launched { mut child, pid, pumps } = launched;

        let (tx, mut rx) = mpsc::channel::<Outcome>(1);
        let waiter: JoinHandle<()> = tokio::spawn(async move {
            let outcome = match child.wait().await {
                Ok(status) if status.success() => Outcome::Success,
                Ok(status) => Outcome::Failed(describe_status(status)),
                Err(e) => Outcome::Failed(e.to_string()),
            };
            let _ = tx.send(outcome).await;
        });

        let outcome = self.wait_for_decision(&mut rx, signals).await;
        info!(pid = ?pid, outcome = %outcome, "supervision decided");

        self.record_exit_file(&outcome);

        if outcome.requires_kill() {
            self.kill(pid);
            // Dropping the child (kill_on_drop) takes care of the direct
            // child if the group signal did not.
            waiter.abort();
        }
        let _ = waiter.await;

        self.drain(pumps).await;
        // After the drain, so the last message carries the final output.
        self.report_exit(&outcome);
        outcome
    }

    async fn wait_for_decision(
        &self,
        completion: &mut mpsc::Receiver<Outcome>,
        signals: &mut SignalSubscription,
    ) -> Outcome {
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                Some(outcome) = completion.recv() => {
                    debug!(outcome = %outcome, "child finished");
                    return outcome;
                }
                _ = &mut deadline => {
                    debug!(timeout = ?self.timeout, "deadline elapsed");
                    return Outcome::TimedOut;
                }
                Some(sig) = signals.recv() => {
                    if sig.is_ignorable() {
                        debug!(signal = %sig, "ignoring OS signal");
                        continue;
                    }
                    warn!(signal = %sig, "received OS signal");
                    return Outcome::SignalReceived;
                }
            }
        }
    }

    fn record_exit_file(&self, outcome: &Outcome) {
        if let Err(e) = record_exit(&self.exit_file, outcome.as_str()) {
            error!(exit_file = %self.exit_file, error = %e, "could not write exit file");
        }
    }

    fn report_exit(&self, outcome: &Outcome) {
        if let Some(reporter) = &self.reporter {
            match reporter.lock() {
                Ok(mut r) => r.send_exit(outcome.as_str()),
                Err(_) => warn!("reporter lock poisoned; exit not reported"),
            }
        }
    }

    fn kill(&self, pid: Option<u32>) {
        if let Some(task_log) = &self.task_log {
            match task_log.clean_up_all(self.control.as_ref()) {
                Ok(report) => info!(?report, "crash recovery finished"),
                Err(e) => error!(error = %e, "crash recovery aborted"),
            }
        }

        info!(child = ?pid, "killing process group");
        if let Err(e) = self.control.kill_own_group() {
            warn!(error = %e, "could not signal own process group");
        }
    }

    async fn drain(&self, pumps: Vec<JoinHandle<()>>) {
        for mut pump in pumps {
            if tokio::time::timeout(self.drain_grace, &mut pump).await.is_err() {
                debug!("output pump still busy after grace period; aborting it");
                pump.abort();
            }
        }
    }
}
