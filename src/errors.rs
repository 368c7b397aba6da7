// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Only [`RcopyError::Launch`] can come out of a run; read and termination
//! faults are absorbed inside the exec layer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RcopyError {
    /// The OS refused to create the child process (missing executable,
    /// permission denied, ...). No exit code exists in this case.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RcopyError>;
