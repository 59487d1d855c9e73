// src/config/model.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Raw `key=value` pairs as read from disk (keys lower-cased).
pub type RawConfig = BTreeMap<String, String>;

/// Placeholder in `interpreter_args` replaced by the agent's own path.
pub const EXE_PLACEHOLDER: &str = "{exe}";

pub const DEFAULT_INTERPRETER: &str = "java";
pub const DEFAULT_INTERPRETER_ARGS: &str = "-Xmx2G -cp {exe} org.bds.Bds";
pub const DEFAULT_TASK_LOG_FLAG: &str = "-pid";
pub const DEFAULT_CHECKSUM_ITERATIONS: u32 = 100;
pub const DEFAULT_CHECKSUM_SLEEP_MS: u64 = 10;

/// Typed agent settings.
///
/// Built from a [`RawConfig`] via `TryFrom` (see `validate.rs`); every key is
/// optional and falls back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Program used to run the workflow interpreter in the default mode.
    pub interpreter: String,
    /// Arguments placed before the task-log flag, already split.
    pub interpreter_args: Vec<String>,
    /// Flag introducing the task-log path on the interpreter command line.
    pub task_log_flag: String,
    /// Whether the readiness gate is allowed to run at all.
    pub checksum: bool,
    pub checksum_iterations: u32,
    pub checksum_sleep: Duration,
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            interpreter_args: DEFAULT_INTERPRETER_ARGS
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            task_log_flag: DEFAULT_TASK_LOG_FLAG.to_string(),
            checksum: true,
            checksum_iterations: DEFAULT_CHECKSUM_ITERATIONS,
            checksum_sleep: Duration::from_millis(DEFAULT_CHECKSUM_SLEEP_MS),
            log_level: None,
        }
    }
}

impl Settings {
    /// Interpreter arguments with `{exe}` substituted.
    pub fn interpreter_args_for(&self, exe_path: &Path) -> Vec<String> {
        let exe = exe_path.to_string_lossy();
        self.interpreter_args
            .iter()
            .map(|a| a.replace(EXE_PLACEHOLDER, &exe))
            .collect()
    }
}
