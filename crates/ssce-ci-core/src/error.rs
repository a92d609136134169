//! Error taxonomy for SSCE CI helpers.

use std::path::PathBuf;

/// Failure of a single artifact store attempt.
///
/// Every transport failure is treated as retryable by the uploader, so this
/// type only carries a description of what went wrong.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("connection to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    #[error("login as {user} rejected: {reason}")]
    Auth { user: String, reason: String },

    #[error("transfer of {remote_path} failed: {reason}")]
    Transfer { remote_path: String, reason: String },

    #[error("cannot read local file {path}: {reason}")]
    LocalFile { path: PathBuf, reason: String },
}

/// SSCE CI errors.
#[derive(Debug, thiserror::Error)]
pub enum CiError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("invalid build id {id:?}: {reason}")]
    InvalidBuildId { id: String, reason: String },

    #[error("invalid package {path}: {reason}")]
    InvalidPackage { path: PathBuf, reason: String },

    #[error("archive {path} failed: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("base64 decode failed: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("gave up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: TransportError,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CiError {
    pub(crate) fn archive(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CiError::Archive {
            path: path.into(),
            source,
        }
    }
}

/// Result type for SSCE CI operations.
pub type Result<T> = std::result::Result<T, CiError>;
