// src/types.rs

//! Small value types shared by the launcher, the supervisor and the task log.

use std::fmt;

use nix::sys::signal::Signal;

/// File name meaning "do not redirect / persist this stream".
pub const NO_FILE: &str = "-";

/// Cleanup annotation meaning "the pid field is a file path to delete".
pub const CMD_REMOVE_FILE: &str = "rm";

/// Outcome string for a child that exited with status zero.
pub const OUTCOME_OK: &str = "0";
/// Outcome string when the deadline elapsed first.
pub const OUTCOME_TIMEOUT: &str = "Time out";
/// Outcome string when a non-ignorable signal arrived first.
pub const OUTCOME_SIGNAL: &str = "Signal received";

/// Returns true if `path` names a real capture file (not empty, not `-`).
pub fn is_capture_path(path: &str) -> bool {
    !path.is_empty() && path != NO_FILE
}

/// Raw outcome of a supervised run, as persisted to the exit file.
///
/// The textual form is part of the contract with whoever polls the exit
/// file, so `Failed` carries the wait-status description verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    TimedOut,
    SignalReceived,
    Failed(String),
}

impl Outcome {
    /// Parse an outcome string back into an `Outcome`.
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            OUTCOME_OK => Outcome::Success,
            OUTCOME_TIMEOUT => Outcome::TimedOut,
            OUTCOME_SIGNAL => Outcome::SignalReceived,
            other => Outcome::Failed(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Success => OUTCOME_OK,
            Outcome::TimedOut => OUTCOME_TIMEOUT,
            Outcome::SignalReceived => OUTCOME_SIGNAL,
            Outcome::Failed(desc) => desc,
        }
    }

    pub fn classify(&self) -> ExitClass {
        match self {
            Outcome::Success => ExitClass::Ok,
            Outcome::TimedOut => ExitClass::Timeout,
            Outcome::SignalReceived | Outcome::Failed(_) => ExitClass::Error,
        }
    }

    /// Whether this outcome requires killing the child's process group.
    pub fn requires_kill(&self) -> bool {
        matches!(self, Outcome::TimedOut | Outcome::SignalReceived)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final classification, mapped onto the agent's own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    Ok,
    Error,
    Timeout,
}

impl ExitClass {
    pub fn code(self) -> i32 {
        match self {
            ExitClass::Ok => 0,
            ExitClass::Error => 1,
            ExitClass::Timeout => 2,
        }
    }
}

/// OS signals the supervisor listens for while a child is running.
///
/// The common ones get their own variant; every other catchable signal is
/// carried as [`OsSignal::Other`] with its raw number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsSignal {
    Hangup,
    Interrupt,
    Quit,
    Terminate,
    User1,
    User2,
    Alarm,
    WindowChanged,
    ChildExited,
    Other(i32),
}

impl OsSignal {
    pub fn from_raw(signo: i32) -> Self {
        match Signal::try_from(signo) {
            Ok(Signal::SIGHUP) => OsSignal::Hangup,
            Ok(Signal::SIGINT) => OsSignal::Interrupt,
            Ok(Signal::SIGQUIT) => OsSignal::Quit,
            Ok(Signal::SIGTERM) => OsSignal::Terminate,
            Ok(Signal::SIGUSR1) => OsSignal::User1,
            Ok(Signal::SIGUSR2) => OsSignal::User2,
            Ok(Signal::SIGALRM) => OsSignal::Alarm,
            Ok(Signal::SIGWINCH) => OsSignal::WindowChanged,
            Ok(Signal::SIGCHLD) => OsSignal::ChildExited,
            _ => OsSignal::Other(signo),
        }
    }

    pub fn as_raw(self) -> i32 {
        let sig = match self {
            OsSignal::Hangup => Signal::SIGHUP,
            OsSignal::Interrupt => Signal::SIGINT,
            OsSignal::Quit => Signal::SIGQUIT,
            OsSignal::Terminate => Signal::SIGTERM,
            OsSignal::User1 => Signal::SIGUSR1,
            OsSignal::User2 => Signal::SIGUSR2,
            OsSignal::Alarm => Signal::SIGALRM,
            OsSignal::WindowChanged => Signal::SIGWINCH,
            OsSignal::ChildExited => Signal::SIGCHLD,
            OsSignal::Other(signo) => return signo,
        };
        sig as i32
    }

    /// Signals emitted routinely that must never trigger a kill.
    pub fn is_ignorable(self) -> bool {
        matches!(self, OsSignal::WindowChanged | OsSignal::ChildExited)
    }

    pub fn name(self) -> &'static str {
        match Signal::try_from(self.as_raw()) {
            Ok(sig) => signal_description(sig),
            Err(_) => "unknown signal",
        }
    }
}

impl fmt::Display for OsSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsSignal::Other(signo) if Signal::try_from(*signo).is_err() => {
                write!(f, "signal {signo}")
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// strsignal(3)-style text, as it appears after `signal: ` in exit files.
pub fn signal_description(sig: Signal) -> &'static str {
    match sig {
        Signal::SIGHUP => "hangup",
        Signal::SIGINT => "interrupt",
        Signal::SIGQUIT => "quit",
        Signal::SIGILL => "illegal instruction",
        Signal::SIGTRAP => "trace/breakpoint trap",
        Signal::SIGABRT => "aborted",
        Signal::SIGBUS => "bus error",
        Signal::SIGFPE => "floating point exception",
        Signal::SIGKILL => "killed",
        Signal::SIGUSR1 => "user defined signal 1",
        Signal::SIGSEGV => "segmentation fault",
        Signal::SIGUSR2 => "user defined signal 2",
        Signal::SIGPIPE => "broken pipe",
        Signal::SIGALRM => "alarm clock",
        Signal::SIGTERM => "terminated",
        Signal::SIGCHLD => "child exited",
        Signal::SIGCONT => "continued",
        Signal::SIGSTOP => "stopped (signal)",
        Signal::SIGTSTP => "stopped",
        Signal::SIGTTIN => "stopped (tty input)",
        Signal::SIGTTOU => "stopped (tty output)",
        Signal::SIGURG => "urgent I/O condition",
        Signal::SIGXCPU => "CPU time limit exceeded",
        Signal::SIGXFSZ => "file size limit exceeded",
        Signal::SIGVTALRM => "virtual timer expired",
        Signal::SIGPROF => "profiling timer expired",
        Signal::SIGWINCH => "window changed",
        Signal::SIGIO => "I/O possible",
        Signal::SIGSYS => "bad system call",
        other => other.as_str(),
    }
}
