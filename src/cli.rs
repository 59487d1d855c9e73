// src/cli.rs

//! Invocation parsing.
//!
//! The first argument selects the mode:
//! - `exec`: supervise one command (positional arguments, parsed with `clap`)
//! - `kill`: kill a process group
//! - anything else: forward everything to the workflow interpreter
//!
//! The `exec` surface is purely positional because callers build it
//! programmatically; `clap` is configured accordingly (no help/version flags,
//! hyphenated values accepted everywhere).

use std::path::PathBuf;

use clap::Parser;

use crate::errors::{AgentError, Result};
use crate::exec::launcher::resolve_exe_path;

pub const EXEC_MODE: &str = "exec";
pub const KILL_MODE: &str = "kill";

/// Positional arguments of the `exec` mode.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowguard exec",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct ExecArgs {
    /// Maximum execution time in seconds (`0` or negative: unbounded).
    #[arg(value_name = "TIMEOUT", allow_hyphen_values = true)]
    pub timeout: String,

    /// Copy stdout to this file (`-`: do not copy).
    #[arg(value_name = "STDOUT_FILE", allow_hyphen_values = true)]
    pub stdout_file: String,

    /// Copy stderr to this file (`-`: do not copy).
    #[arg(value_name = "STDERR_FILE", allow_hyphen_values = true)]
    pub stderr_file: String,

    /// Write the outcome to this file (`-`: do not write).
    #[arg(value_name = "EXIT_FILE", allow_hyphen_values = true)]
    pub exit_file: String,

    #[arg(value_name = "COMMAND", allow_hyphen_values = true)]
    pub command: String,

    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments of the `kill` mode.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "flowguard kill",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct KillArgs {
    /// Process group id to send SIGHUP to.
    #[arg(value_name = "PID")]
    pub pid: i32,
}

/// A validated `exec` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    /// Seconds; non-positive means "effectively unbounded".
    pub timeout_secs: i64,
    pub stdout_file: String,
    pub stderr_file: String,
    pub exit_file: String,
    pub command: String,
    pub args: Vec<String>,
}

impl TryFrom<ExecArgs> for ExecRequest {
    type Error = AgentError;

    fn try_from(raw: ExecArgs) -> std::result::Result<Self, Self::Error> {
        let timeout_secs = raw
            .timeout
            .trim()
            .parse::<i64>()
            .map_err(|_| AgentError::InvalidTimeout(raw.timeout.clone()))?;

        Ok(Self {
            timeout_secs,
            stdout_file: raw.stdout_file,
            stderr_file: raw.stderr_file,
            exit_file: raw.exit_file,
            command: raw.command,
            args: raw.args,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Launch the workflow interpreter with these user arguments.
    Interpreter { args: Vec<String> },
    Execute(ExecRequest),
    Kill { pid: i32 },
}

/// Parsed command line plus the agent's own absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub mode: Mode,
    /// Raw arguments, including the program name.
    pub args: Vec<String>,
    pub exe_path: PathBuf,
}

impl Invocation {
    /// Parse the process arguments, program name first.
    ///
    /// Must run before anything changes the current directory, since the
    /// executable path may be relative to it.
    pub fn parse(args: Vec<String>) -> Result<Self> {
        let argv0 = args
            .first()
            .cloned()
            .ok_or_else(|| AgentError::Usage("missing program name".to_string()))?;
        let exe_path = resolve_exe_path(&argv0)?;
        let mode = parse_mode(&args)?;

        Ok(Self {
            mode,
            args,
            exe_path,
        })
    }
}

fn parse_mode(args: &[String]) -> Result<Mode> {
    match args.get(1).map(String::as_str) {
        Some(EXEC_MODE) => {
            let raw = ExecArgs::try_parse_from(&args[2..]).map_err(|_| {
                AgentError::Usage("Invalid number of parameters for 'exec' command".to_string())
            })?;
            Ok(Mode::Execute(ExecRequest::try_from(raw)?))
        }
        Some(KILL_MODE) => {
            let raw = KillArgs::try_parse_from(&args[2..]).map_err(|e| {
                AgentError::Usage(format!("Invalid parameters for 'kill' command: {}", e.kind()))
            })?;
            if raw.pid <= 0 {
                return Err(AgentError::Usage(format!(
                    "Invalid process group id for 'kill' command: {}",
                    raw.pid
                )));
            }
            Ok(Mode::Kill { pid: raw.pid })
        }
        _ => Ok(Mode::Interpreter {
            args: args.iter().skip(1).cloned().collect(),
        }),
    }
}

/// Full usage diagnostic: message, argument dump, help summary.
pub fn usage_text(msg: &str, args: &[String]) -> String {
    let mut out = String::new();
    if !msg.is_empty() {
        out.push_str(&format!("Error: {msg}\n"));
        out.push_str("Arguments:\n");
        for (n, arg) in args.iter().skip(1).enumerate() {
            out.push_str(&format!("\t{n} : {arg}\n"));
        }
        out.push('\n');
    }

    out.push_str(
        "Usage: flowguard command\n\n\
         Commands:\n\n\
         \x20 default :  Run the workflow interpreter\n\
         \x20            Syntax:\n\
         \x20                flowguard [options] program\n\n\
         \x20 exec    :  Execute a command and:\n\
         \x20                i) Show pid.\n\
         \x20                ii) Enforce maximum execution time.\n\
         \x20                iii) Copy STDOUT and STDERR to files.\n\
         \x20                iv) Write the outcome to a file.\n\
         \x20            Note: If any file name is '-' it is ignored (not redirected).\n\
         \x20            Syntax:\n\
         \x20                flowguard exec timeout file.stdout file.stderr file.exit command arguments...\n\n\
         \x20 kill pid : Kill process group 'pid'.\n",
    );
    out
}
