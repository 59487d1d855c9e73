// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::model::{RawConfig, Settings};
use crate::errors::Result;

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV: &str = "FLOWGUARD_CONFIG";

/// Settings file name looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "flowguard.config";

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([^#=\s][^=]*?)\s*=(.*)$").expect("static regex is valid")
    })
}

/// Parse `key=value` text.
///
/// - blank lines and lines starting with `#` are ignored
/// - keys are trimmed and lower-cased
/// - values keep their inner whitespace; a trailing `\r` is dropped
/// - lines without `=` are silently skipped
pub fn parse_config(contents: &str) -> RawConfig {
    let mut map = RawConfig::new();
    let re = line_regex();

    for line in contents.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        match re.captures(line) {
            Some(caps) => {
                let key = caps[1].to_lowercase();
                map.insert(key, caps[2].to_string());
            }
            None => debug!(line = %line, "skipping malformed config line"),
        }
    }

    map
}

/// Load a `key=value` file. A missing or unreadable file yields an empty map.
pub fn load_config(path: impl AsRef<Path>) -> RawConfig {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents),
        Err(e) => {
            debug!(path = ?path, error = %e, "config file not loaded; using defaults");
            RawConfig::new()
        }
    }
}

/// Load and validate settings from the default location.
pub fn load_settings(exe_path: &Path) -> Result<Settings> {
    let path = default_config_path(exe_path);
    let raw = load_config(&path);
    Settings::try_from(raw)
}

/// Resolve the settings file location.
///
/// `FLOWGUARD_CONFIG` wins; otherwise `flowguard.config` in the directory
/// holding the executable.
pub fn default_config_path(exe_path: &Path) -> PathBuf {
    if let Ok(p) = std::env::var(CONFIG_ENV) {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    match exe_path.parent() {
        Some(dir) => dir.join(CONFIG_FILE_NAME),
        None => PathBuf::from(CONFIG_FILE_NAME),
    }
}
