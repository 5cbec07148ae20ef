//! Error types for job sockets.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised while reading, mutating or persisting a socket.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed socket document {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value for {path} does not fit the socket document: {reason}")]
    InvalidValue { path: String, reason: String },

    #[error("Socket id {0:?} does not map to a file")]
    InvalidIdentifier(String),
}

impl SocketError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Translation catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum LocaleError {
    #[error("Failed to read catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog {} is not a flat JSON object of strings: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
