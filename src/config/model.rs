// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::types::CopyMode;

pub const DEFAULT_PROGRAM: &str = "robocopy";
pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 128;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// program = "robocopy"
/// threads = 8
/// drain_timeout_ms = 5000
/// default_mode = "mirror"
///
/// [mode.mirror]
/// options = "/MIR /COPY:DATSO /Z /R:3 /W:2 /V /NP /TEE"
///
/// [mode.backup]
/// options = "/E /COPY:DAT /Z /R:3 /W:2 /V /NP /TEE"
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Copy tool executable, looked up on `PATH`.
    #[serde(default = "default_program")]
    pub program: String,

    /// Value for `/MT:<n>`. Defaults to the number of available cores.
    #[serde(default)]
    pub threads: Option<usize>,

    /// Grace period for output pumps after a cancellation.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Mode used when the CLI does not pick one.
    #[serde(default)]
    pub default_mode: CopyMode,

    /// Per-mode flag overrides from `[mode.<name>]`.
    #[serde(default)]
    pub mode: BTreeMap<String, ModeConfig>,
}

fn default_program() -> String {
    DEFAULT_PROGRAM.to_string()
}

fn default_drain_timeout_ms() -> u64 {
    5_000
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            program: default_program(),
            threads: None,
            drain_timeout_ms: default_drain_timeout_ms(),
            default_mode: CopyMode::default(),
            mode: BTreeMap::new(),
        }
    }
}

/// `[mode.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeConfig {
    pub options: String,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    program: String,
    threads: usize,
    drain_timeout: Duration,
    default_mode: CopyMode,
    modes: BTreeMap<CopyMode, String>,
}

impl ConfigFile {
    /// Build without validation; see `validate.rs` for the checked path.
    pub(crate) fn new_unchecked(
        program: String,
        threads: usize,
        drain_timeout: Duration,
        default_mode: CopyMode,
        modes: BTreeMap<CopyMode, String>,
    ) -> Self {
        Self {
            program,
            threads,
            drain_timeout,
            default_mode,
            modes,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    pub fn default_mode(&self) -> CopyMode {
        self.default_mode
    }

    /// Flags for `mode`, falling back to the built-in preset.
    pub fn options_for(&self, mode: CopyMode) -> &str {
        self.modes
            .get(&mode)
            .map(String::as_str)
            .unwrap_or_else(|| mode.preset_options())
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            default_program(),
            default_threads(),
            Duration::from_millis(default_drain_timeout_ms()),
            CopyMode::default(),
            BTreeMap::new(),
        )
    }
}

pub(crate) fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_THREADS)
        .clamp(MIN_THREADS, MAX_THREADS)
}
