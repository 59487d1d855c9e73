// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{RawConfig, Settings};
use crate::errors::{AgentError, Result};

impl TryFrom<RawConfig> for Settings {
    type Error = AgentError;

    fn try_from(raw: RawConfig) -> std::result::Result<Self, Self::Error> {
        let mut settings = Settings::default();

        if let Some(v) = non_empty(&raw, "interpreter") {
            settings.interpreter = v.to_string();
        }
        if let Some(v) = non_empty(&raw, "interpreter_args") {
            settings.interpreter_args = shlex::split(v).ok_or_else(|| {
                config_error(format!("interpreter_args has unbalanced quotes: {v}"))
            })?;
        }
        if let Some(v) = non_empty(&raw, "task_log_flag") {
            settings.task_log_flag = v.to_string();
        }
        if let Some(v) = non_empty(&raw, "checksum") {
            settings.checksum = parse_bool("checksum", v)?;
        }
        if let Some(v) = non_empty(&raw, "checksum_iterations") {
            let iters: u32 = v
                .parse()
                .map_err(|e| config_error(format!("checksum_iterations '{v}': {e}")))?;
            if iters == 0 {
                return Err(config_error("checksum_iterations must be >= 1 (got 0)".to_string()));
            }
            settings.checksum_iterations = iters;
        }
        if let Some(v) = non_empty(&raw, "checksum_sleep_ms") {
            let ms: u64 = v
                .parse()
                .map_err(|e| config_error(format!("checksum_sleep_ms '{v}': {e}")))?;
            settings.checksum_sleep = Duration::from_millis(ms);
        }
        if let Some(v) = non_empty(&raw, "log_level") {
            settings.log_level = Some(v.to_string());
        }

        Ok(settings)
    }
}

fn non_empty<'a>(raw: &'a RawConfig, key: &str) -> Option<&'a str> {
    raw.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        other => Err(config_error(format!(
            "{key} must be a boolean (got '{other}')"
        ))),
    }
}

fn config_error(msg: String) -> AgentError {
    AgentError::ConfigError(msg)
}
