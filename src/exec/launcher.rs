// src/exec/launcher.rs

//! Starting the supervised child process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use path_clean::PathClean;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::{AgentError, Result};
use crate::exec::process_group::isolate_process_group;
use crate::exec::tee::{StreamKind, Tee, spawn_pump};
use crate::report::SharedReporter;
use crate::types::is_capture_path;

/// Absolute, cleaned path of the running executable.
///
/// Resolution order: already absolute; relative to the current directory if
/// such a file exists; lookup on `PATH`. Must be called before the current
/// directory changes.
pub fn resolve_exe_path(name: &str) -> Result<PathBuf> {
    let not_found = |reason: String| AgentError::ExecutableNotFound {
        name: name.to_string(),
        reason,
    };

    let path = Path::new(name);
    if path.is_absolute() {
        return Ok(path.clean());
    }

    let cwd = std::env::current_dir().map_err(|e| not_found(format!("getcwd failed: {e}")))?;

    if path.exists() {
        return Ok(cwd.join(path).clean());
    }

    let found = which::which(name).map_err(|e| not_found(format!("lookup failed: {e}")))?;
    if found.is_absolute() {
        Ok(found.clean())
    } else {
        Ok(cwd.join(found).clean())
    }
}

/// Everything needed to start one child.
#[derive(Clone, Default)]
pub struct LaunchSpec {
    pub command: String,
    pub args: Vec<String>,
    /// Capture file for stdout; empty or `-` means inherit.
    pub stdout_file: String,
    /// Capture file for stderr; empty or `-` means inherit.
    pub stderr_file: String,
    /// Move the agent into a new process group before starting the child.
    pub isolate: bool,
    /// Optional reporter fed with everything the child prints.
    pub reporter: Option<SharedReporter>,
}

impl std::fmt::Debug for LaunchSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchSpec")
            .field("command", &self.command)
            .field("args", &self.args)
            .field("stdout_file", &self.stdout_file)
            .field("stderr_file", &self.stderr_file)
            .field("isolate", &self.isolate)
            .field("reporter", &self.reporter.is_some())
            .finish()
    }
}

/// A started child plus the tasks copying its output.
#[derive(Debug)]
pub struct Launched {
    pub child: Child,
    pub pid: Option<u32>,
    pub pumps: Vec<JoinHandle<()>>,
}

/// Start the child described by `spec`.
///
/// stdin is always inherited. Capture files are created (truncated) before
/// the child starts, so they exist even if the child prints nothing.
pub async fn launch(spec: &LaunchSpec) -> Result<Launched> {
    if spec.isolate {
        isolate_process_group();
    }

    let stdout_tee = open_tee(&spec.stdout_file, StreamKind::Stdout, spec).await?;
    let stderr_tee = open_tee(&spec.stderr_file, StreamKind::Stderr, spec).await?;

    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .stdin(Stdio::inherit())
        .stdout(if stdout_tee.is_some() { Stdio::piped() } else { Stdio::inherit() })
        .stderr(if stderr_tee.is_some() { Stdio::piped() } else { Stdio::inherit() })
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| AgentError::Spawn {
        command: spec.command.clone(),
        source,
    })?;
    let pid = child.id();

    info!(pid = ?pid, command = %spec.command, args = ?spec.args, "started child process");

    let mut pumps = Vec::new();
    if let (Some(tee), Some(out)) = (stdout_tee, child.stdout.take()) {
        pumps.push(spawn_pump(out, tee));
    }
    if let (Some(tee), Some(err)) = (stderr_tee, child.stderr.take()) {
        pumps.push(spawn_pump(err, tee));
    }

    Ok(Launched { child, pid, pumps })
}

async fn open_tee(path: &str, kind: StreamKind, spec: &LaunchSpec) -> Result<Option<Tee>> {
    if !is_capture_path(path) && spec.reporter.is_none() {
        debug!(stream = ?kind, "stream not captured; child inherits it");
        return Ok(None);
    }
    let tee = Tee::create(path, kind, spec.reporter.clone()).await?;
    Ok(Some(tee))
}
