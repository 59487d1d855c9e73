// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod report;
pub mod tasklog;
pub mod types;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::cli::{ExecRequest, Invocation, Mode};
use crate::config::Settings;
use crate::errors::Result;
use crate::exec::launcher::{LaunchSpec, launch};
use crate::exec::readiness::{ReadinessGate, looks_like_generated_script};
use crate::exec::supervisor::{Supervisor, timeout_from_secs};
use crate::exec::{ProcessControl, SignalSubscription, UnixProcessControl, kill_group};
use crate::report::reporter_from_env;
use crate::tasklog::TaskLog;
use crate::types::Outcome;

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code.
pub async fn run(invocation: Invocation, settings: Settings) -> Result<i32> {
    let agent = Agent::new(invocation.exe_path.clone(), settings);
    match invocation.mode {
        Mode::Kill { pid } => {
            kill_group(pid)?;
            Ok(0)
        }
        Mode::Execute(req) => agent.execute(req).await,
        Mode::Interpreter { args } => agent.launch_interpreter(args).await,
    }
}

/// One agent process: its own path, settings and the OS side effects.
pub struct Agent {
    exe_path: PathBuf,
    settings: Settings,
    control: Arc<dyn ProcessControl>,
    task_log_dir: PathBuf,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("exe_path", &self.exe_path)
            .field("settings", &self.settings)
            .field("task_log_dir", &self.task_log_dir)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(exe_path: PathBuf, settings: Settings) -> Self {
        Self {
            exe_path,
            settings,
            control: Arc::new(UnixProcessControl),
            task_log_dir: std::env::temp_dir(),
        }
    }

    pub fn with_control(mut self, control: Arc<dyn ProcessControl>) -> Self {
        self.control = control;
        self
    }

    pub fn with_task_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.task_log_dir = dir.into();
        self
    }

    pub fn exe_path(&self) -> &Path {
        &self.exe_path
    }

    /// `exec` mode: supervise one command as a delegate.
    pub async fn execute(&self, req: ExecRequest) -> Result<i32> {
        // Subscribe before the handshake so a signal sent right after the
        // parent reads our pid is not fatal.
        let mut signals = SignalSubscription::subscribe_all()?;
        print_pid_handshake()?;

        let gate_disabled = !self.settings.checksum
            || !looks_like_generated_script(Path::new(&req.command)).await;
        let ready = ReadinessGate::from_settings(&self.settings)
            .wait_until_ready(Path::new(&req.command), gate_disabled)
            .await;
        if !ready {
            debug!(command = %req.command, "script checksum not confirmed; launching anyway");
        }

        let reporter = reporter_from_env();
        let spec = LaunchSpec {
            command: req.command,
            args: req.args,
            stdout_file: req.stdout_file,
            stderr_file: req.stderr_file,
            isolate: true,
            reporter: reporter.clone(),
        };

        let supervisor = Supervisor::new(
            Arc::clone(&self.control),
            timeout_from_secs(req.timeout_secs),
            req.exit_file,
        )
        .with_reporter(reporter);

        let outcome = self.launch_and_supervise(&spec, &supervisor, &mut signals).await?;
        Ok(outcome.classify().code())
    }

    /// Default mode: run the workflow interpreter as the root instance.
    pub async fn launch_interpreter(&self, user_args: Vec<String>) -> Result<i32> {
        let task_log = TaskLog::create_for_pid(&self.task_log_dir, std::process::id())?;

        let mut args = self.settings.interpreter_args_for(&self.exe_path);
        args.push(self.settings.task_log_flag.clone());
        args.push(task_log.path().to_string_lossy().into_owned());
        args.extend(user_args);

        info!(interpreter = %self.settings.interpreter, task_log = ?task_log.path(), "launching interpreter");

        let mut signals = SignalSubscription::subscribe_all()?;
        let spec = LaunchSpec {
            command: self.settings.interpreter.clone(),
            args,
            isolate: false,
            ..LaunchSpec::default()
        };

        let supervisor = Supervisor::new(Arc::clone(&self.control), timeout_from_secs(0), "")
            .with_task_log(task_log);

        let outcome = self.launch_and_supervise(&spec, &supervisor, &mut signals).await?;
        Ok(outcome.classify().code())
    }

    async fn launch_and_supervise(
        &self,
        spec: &LaunchSpec,
        supervisor: &Supervisor,
        signals: &mut SignalSubscription,
    ) -> Result<Outcome> {
        let launched = launch(spec).await?;
        Ok(supervisor.supervise(launched, signals).await)
    }
}

/// Print our pid as the very first stdout line; the parent reads it before
/// anything else.
fn print_pid_handshake() -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", std::process::id()).context("writing pid handshake")?;
    out.flush().context("flushing pid handshake")?;
    Ok(())
}
