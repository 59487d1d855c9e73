// tests/common/mod.rs

#![allow(dead_code)]

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, Stdio};

pub use flowguard_test_utils::init_tracing;

/// The built agent binary, isolated from whatever the developer has in
/// their environment.
pub fn agent() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flowguard"));
    cmd.env("FLOWGUARD_CONFIG", "/nonexistent/flowguard.config")
        .env_remove("FLOWGUARD_REPORT_SPOOL")
        .env_remove("FLOWGUARD_TASK_ID")
        .env_remove("FLOWGUARD_LOG");
    cmd
}

/// Spawn `agent exec ...` with stdout piped and read the pid handshake.
pub fn spawn_exec(args: &[&str]) -> (Child, u32) {
    let mut child = agent()
        .arg("exec")
        .args(args)
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn agent");

    let stdout = child.stdout.take().expect("piped stdout");
    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("read pid handshake");
    let pid = line.trim().parse().expect("first stdout line is a pid");
    (child, pid)
}
