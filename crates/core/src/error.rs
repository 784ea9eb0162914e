//! Unified error types for the shared toolbelt library.

use tokio_rusqlite::rusqlite;

use crate::config::ConfigError;

/// Errors raised by the shared library (config, cache, sessions, output).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed user input caught before any network call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration could not be loaded, validated or saved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database operation failed.
    #[error("cache error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("cache error: migration failed: {0}")]
    MigrationFailed(String),

    /// Session names must stay inside the sessions directory.
    #[error("invalid session name '{0}': use letters, digits, '-' or '_' (max 64)")]
    InvalidSessionName(String),

    /// Filesystem access failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
