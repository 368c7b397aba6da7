// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::CopyMode;

/// Command-line arguments for `rcopy`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rcopy",
    version,
    about = "Run robocopy with live output, progress and clean cancellation.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to copy from. Passed to the copy tool as-is.
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Directory to copy to. Passed to the copy tool as-is.
    #[arg(value_name = "DESTINATION")]
    pub destination: String,

    /// Flag preset: `mirror` or `backup`.
    ///
    /// If omitted, `default_mode` from the config file is used.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<CopyMode>,

    /// Raw flags replacing the mode preset, e.g. "/E /R:1".
    #[arg(long, value_name = "FLAGS", allow_hyphen_values = true)]
    pub options: Option<String>,

    /// Copy threads (`/MT:<n>`), clamped to 1..=128.
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Copy tool executable (default: `robocopy`).
    #[arg(long, value_name = "EXE")]
    pub program: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `rcopy.toml` in the current working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RCOPY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print each detected percentage to stderr.
    #[arg(long)]
    pub progress: bool,

    /// Print the command line that would run, without running it.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
