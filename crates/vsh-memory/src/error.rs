//! In-memory backend errors

use std::path::PathBuf;

use thiserror::Error;
use vsh_core::BackendError;

#[derive(Debug, Error)]
pub enum MemoryBackendError {
    /// Config or feed file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config or feed file has invalid content
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Connectivity switched off
    #[error("Backend disconnected")]
    Disconnected,

    /// Write to a point declared read-only
    #[error("State {0} is read-only")]
    ReadOnly(String),
}

impl From<MemoryBackendError> for BackendError {
    fn from(err: MemoryBackendError) -> Self {
        match err {
            MemoryBackendError::Disconnected => BackendError::Unreachable(err.to_string()),
            MemoryBackendError::ReadOnly(id) => BackendError::InvalidValue {
                id,
                message: "read-only".to_string(),
            },
            MemoryBackendError::Io { .. } | MemoryBackendError::Parse { .. } => {
                BackendError::Internal(err.to_string())
            }
        }
    }
}
