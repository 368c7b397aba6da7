// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rcopy.toml";

/// Read, parse and validate the config file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let raw: RawConfigFile = toml::from_str(&contents)?;
    ConfigFile::try_from(raw)
}

/// Load the explicitly requested file, or `rcopy.toml` if it exists.
///
/// - An explicit path that cannot be read is an error.
/// - A missing default file means built-in defaults.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config");
        return load_from_path(path);
    }

    let default_path = Path::new(DEFAULT_CONFIG_FILE);
    if default_path.is_file() {
        debug!(path = %default_path.display(), "loading default config");
        load_from_path(default_path)
    } else {
        debug!("no config file; using built-in defaults");
        Ok(ConfigFile::default())
    }
}
