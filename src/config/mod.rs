// src/config/mod.rs

//! Configuration for rcopy.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading a config file, with a fallback to built-in defaults.
//! - `validate.rs`: turning the raw file into a checked [`ConfigFile`].

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_from_path, load_or_default};
pub use model::{ConfigFile, ModeConfig, RawConfigFile};
