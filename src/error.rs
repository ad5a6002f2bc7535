//! Error taxonomy shared by the backup store, the transaction and the
//! file resources.
//!
//! Non-zero exits of external commands are not errors at this level; they
//! come back as [`crate::process::ProcessResult`] values. A transaction that
//! fails on one records the matching [`ErrorKind`] in its outcome, which the
//! API maps to a status code alongside the command output.

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the core.
pub type ConfResult<T> = Result<T, ConfError>;

/// Coarse classification of a failure, stable enough to assert against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    IoError,
    NotFound,
    InvalidName,
    AlreadyExists,
    BadRequest,
    ValidationFailed,
    ReloadFailed,
    Timeout,
    /// Backup could not be written; the live artifact was not touched.
    BackupFailed,
    /// The new content could not be written to the live artifact.
    WriteFailed,
}

/// Errors produced by configuration file operations.
#[derive(Debug, Error)]
pub enum ConfError {
    /// Filesystem failure with the operation and path that caused it.
    #[error("{operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("{0} already exists")]
    AlreadyExists(String),
}

impl ConfError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfError::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfError::Io { .. } => ErrorKind::IoError,
            ConfError::NotFound(_) => ErrorKind::NotFound,
            ConfError::InvalidName(_) => ErrorKind::InvalidName,
            ConfError::AlreadyExists(_) => ErrorKind::AlreadyExists,
        }
    }
}
