//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// Every variant aborts startup with exit code 1.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configuration file could not be read or parsed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No API key in the configuration or the environment.
    #[error("no API key for {provider}: set backend.api_key or {var}")]
    MissingApiKey {
        provider: &'static str,
        var: &'static str,
    },

    /// Neither the configuration nor the command line names a server.
    #[error("no servers configured: add [[servers]] to the config or pass server scripts")]
    NoServers,

    /// A server script path has no usable file name.
    #[error("invalid server script: {}", path.display())]
    InvalidScript { path: PathBuf },

    /// An error occurred in the runtime layer.
    #[error(transparent)]
    Runtime(#[from] runtime::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
