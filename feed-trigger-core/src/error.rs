//! Error types for feed-trigger-core.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal startup errors: the run aborts before any feed is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading config or creating app directories.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The config file did not exist at the expected path.
    #[error("config not found at {path}")]
    NotFound { path: PathBuf },

    /// `run` is missing or empty.
    #[error("\"run\" must list a command and its arguments: {path}")]
    EmptyRun { path: PathBuf },

    /// `run[0]` is an empty string.
    #[error("\"run\" must start with a non-empty program name: {path}")]
    EmptyProgram { path: PathBuf },

    /// `dirs` could not resolve the platform config/data directories.
    #[error("cannot determine config or data directory; set $HOME or equivalent")]
    DirsNotFound,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
