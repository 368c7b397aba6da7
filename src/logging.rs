// src/logging.rs

//! Logging setup for `rcopy` using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. the `--log-level` flag, applied to everything;
//! 2. `RCOPY_LOG`, read as `EnvFilter` directives (`debug`,
//!    `rcopy::exec=trace,warn`, ...);
//! 3. `warn`.
//!
//! Logs go to STDERR; stdout carries the copy tool's own output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "RCOPY_LOG";

const DEFAULT_DIRECTIVE: &str = "warn";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

/// Pick the filter for this process. An unparsable `env` value falls back to
/// the default with a note on stderr (the subscriber is not up yet).
pub fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(directive_for(level));
    }

    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("ignoring {LOG_ENV}={directives:?}: {e}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

fn directive_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
