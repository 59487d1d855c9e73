// src/logging.rs

//! Logging setup for `flowguard` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `FLOWGUARD_LOG` environment variable (e.g. "info", "debug")
//! 2. `log_level` key of the settings file
//! 3. default to `warn`
//!
//! Logs are sent to STDERR. STDOUT carries the pid handshake followed by the
//! child's own output, and the default level keeps captured stderr free of
//! agent chatter.

use anyhow::Result;
use tracing_subscriber::fmt;

pub const LOG_ENV: &str = "FLOWGUARD_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(config_level: Option<&str>) -> Result<()> {
    let level = resolve_level(std::env::var(LOG_ENV).ok().as_deref(), config_level);

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Pick the effective level: environment, then settings, then `warn`.
pub fn resolve_level(env_level: Option<&str>, config_level: Option<&str>) -> tracing::Level {
    env_level
        .and_then(parse_level_str)
        .or_else(|| config_level.and_then(parse_level_str))
        .unwrap_or(tracing::Level::WARN)
}

pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
