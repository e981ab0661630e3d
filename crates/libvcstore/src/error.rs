use std::{io, path::PathBuf, result::Result as StdResult};
use thiserror::Error;

/// Custom Result type for vcstore operations.
pub type Result<T> = StdResult<T, VcStoreError>;

/// Errors raised by versioned file handlers.
#[derive(Error, Debug)]
pub enum VcStoreError {
    /// The handler could not be constructed for the given directory.
    #[error("Cannot use {dir}: {message}")]
    Construction {
        /// Directory the handler was asked to manage.
        dir: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// A synchronous status, add, move or delete step failed.
    #[error("Operation failed on {path}: {message}")]
    Operation {
        /// Path the operation was working on.
        path: PathBuf,
        /// Human-readable error description.
        message: String,
    },

    /// A deferred commit failed. Only ever logged by the background committer.
    #[error("Commit failed: {0}")]
    Commit(String),

    /// The working copy no longer accepts new commits.
    #[error("Working copy {dir} has been shut down")]
    ShutDown {
        /// Root of the working copy that was shut down.
        dir: PathBuf,
    },

    /// The configuration is invalid or could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An underlying I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl VcStoreError {
    /// Build an operation error from any displayable failure, keeping its context chain.
    pub(crate) fn operation(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::Operation {
            path: path.into(),
            message: format!("{err:#}"),
        }
    }

    /// Return the recommended process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Construction { .. } => 2,
            Self::Config(_) => 2,
            Self::Operation { .. } => 3,
            Self::ShutDown { .. } => 4,
            _ => 1,
        }
    }
}
