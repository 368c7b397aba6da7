// src/config/validate.rs

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::config::model::{
    ConfigFile, MAX_THREADS, MIN_THREADS, RawConfigFile, default_threads,
};
use crate::errors::{RcopyError, Result};
use crate::types::CopyMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RcopyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_program(&raw)?;
        validate_drain_timeout(&raw)?;
        let modes = validate_modes(&raw)?;
        let threads = clamp_threads(raw.threads);

        Ok(ConfigFile::new_unchecked(
            raw.program.trim().to_string(),
            threads,
            Duration::from_millis(raw.drain_timeout_ms),
            raw.default_mode,
            modes,
        ))
    }
}

fn validate_program(cfg: &RawConfigFile) -> Result<()> {
    if cfg.program.trim().is_empty() {
        return Err(RcopyError::ConfigError(
            "`program` must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_drain_timeout(cfg: &RawConfigFile) -> Result<()> {
    if cfg.drain_timeout_ms == 0 {
        return Err(RcopyError::ConfigError(
            "`drain_timeout_ms` must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_modes(cfg: &RawConfigFile) -> Result<BTreeMap<CopyMode, String>> {
    let mut modes = BTreeMap::new();
    for (name, section) in cfg.mode.iter() {
        let mode = CopyMode::from_str(name).map_err(|e| {
            RcopyError::ConfigError(format!("[mode.{name}]: {e}"))
        })?;
        modes.insert(mode, section.options.trim().to_string());
    }
    Ok(modes)
}

/// Clamp to `MIN_THREADS..=MAX_THREADS`; out-of-range values are not errors.
pub fn clamp_threads(threads: Option<usize>) -> usize {
    match threads {
        None => default_threads(),
        Some(n) => {
            let clamped = n.clamp(MIN_THREADS, MAX_THREADS);
            if clamped != n {
                warn!(requested = n, using = clamped, "thread count out of range; clamping");
            }
            clamped
        }
    }
}
