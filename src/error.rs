//! Error types shared across the viewer

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid report data: {0}")]
    Json(#[from] serde_json::Error),

    /// A GUNC table row or header could not be read
    #[error("{path}:{line}: {message}")]
    Table {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// The rendering surface rejected a chart
    #[error("failed to mount chart: {0}")]
    Mount(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to listen on {addr}: {message}")]
    Server { addr: String, message: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }
}

/// Failure to retrieve a detail fragment. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}
