// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches the supervised command with `tokio::process::Command`
//! and decides how its run ends.
//!
//! - [`launcher`] resolves the agent's own path and starts the child.
//! - [`tee`] copies child output to capture files while echoing it.
//! - [`readiness`] waits for a generated script's checksum trailer.
//! - [`signals`] holds the scoped OS signal subscription.
//! - [`process_group`] isolates the agent and kills process groups.
//! - [`supervisor`] multiplexes completion, timeout and signals.
//! - [`exit_file`] persists the raw outcome string.

pub mod exit_file;
pub mod launcher;
pub mod process_group;
pub mod readiness;
pub mod signals;
pub mod supervisor;
pub mod tee;

pub use exit_file::record_exit;
pub use launcher::{LaunchSpec, Launched, launch, resolve_exe_path};
pub use process_group::{ProcessControl, UnixProcessControl, isolate_process_group, kill_group};
pub use readiness::ReadinessGate;
pub use signals::SignalSubscription;
pub use supervisor::Supervisor;
