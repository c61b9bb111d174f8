//! Error types shared by the store, the command handlers and configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reading or writing the persisted task document.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The storage backend could not be read or written.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The task collection could not be serialised.
    #[error("failed to serialise tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// User input rejected before it reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("text must not be empty")]
    EmptyText,

    #[error("'{0}' is not a whole number between 0 and 100")]
    NotANumber(String),

    #[error("'{0}' is not a recognised date (try YYYY-MM-DD, today, tomorrow, in 3d)")]
    InvalidDate(String),
}

/// Problems resolving the runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to create data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
