// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Bad command line; `main` prints the usage text for these.
    #[error("{0}")]
    Usage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid time: '{0}'")]
    InvalidTimeout(String),

    #[error("cannot resolve executable path for '{name}': {reason}")]
    ExecutableNotFound { name: String, reason: String },

    #[error("cannot start command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cleanup command '{command}' failed: {reason}")]
    CleanupCommand { command: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("signal error: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentError {
    /// Errors that should be reported together with the usage summary.
    pub fn is_usage(&self) -> bool {
        matches!(self, AgentError::Usage(_) | AgentError::InvalidTimeout(_))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AgentError>;
