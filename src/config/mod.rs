// src/config/mod.rs

//! Configuration for flowguard.
//!
//! Responsibilities:
//! - Parse `key=value` files into a string map (`loader.rs`).
//! - Define the typed settings and their defaults (`model.rs`).
//! - Turn the raw map into validated settings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_config, load_settings, parse_config};
pub use model::{RawConfig, Settings};
