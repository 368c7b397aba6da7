use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Which child stream a chunk was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => f.write_str("stdout"),
            StreamKind::Stderr => f.write_str("stderr"),
        }
    }
}

/// A chunk of child output, exactly as it was read.
///
/// The text is not necessarily a full line: a chunk may end mid-line or hold
/// several lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEvent {
    pub stream: StreamKind,
    pub text: String,
}

/// A percentage found in a chunk, already clamped to `0..=100`.
///
/// Values are not monotonic: copy tools report per-file percentages that
/// start over for every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stream: StreamKind,
    pub percent: u8,
}

/// Terminal result of a run that actually launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own with this raw exit code (`-1` when it was
    /// terminated by a signal and no code exists).
    Exited(i32),
    /// The cancellation token fired before the child exited.
    Cancelled,
}

impl RunOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunOutcome::Exited(code) => Some(*code),
            RunOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }
}

/// Preset flag sets for the copy tool.
///
/// Deserialises through [`FromStr`], so TOML values are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum CopyMode {
    /// Make the destination an exact mirror of the source (deletes extras).
    Mirror,
    /// Copy everything, never delete from the destination.
    Backup,
}

impl CopyMode {
    /// Built-in robocopy flags for this mode.
    pub fn preset_options(&self) -> &'static str {
        match self {
            CopyMode::Mirror => "/MIR /COPY:DATSO /Z /R:3 /W:2 /V /NP /TEE",
            CopyMode::Backup => "/E /COPY:DAT /Z /R:3 /W:2 /V /NP /TEE",
        }
    }
}

impl Default for CopyMode {
    fn default() -> Self {
        CopyMode::Mirror
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyMode::Mirror => f.write_str("mirror"),
            CopyMode::Backup => f.write_str("backup"),
        }
    }
}

impl FromStr for CopyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mirror" => Ok(CopyMode::Mirror),
            "backup" => Ok(CopyMode::Backup),
            other => Err(format!(
                "invalid copy mode: {other} (expected \"mirror\" or \"backup\")"
            )),
        }
    }
}

impl TryFrom<String> for CopyMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
