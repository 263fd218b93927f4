//! Error types for clone-bench

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single clone attempt
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("libgit2 error: {0}")]
    Git(#[from] git2::Error),

    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git exited with {status}: {stderr}")]
    GitExit { status: String, stderr: String },

    #[error("remote did not advertise a default branch")]
    NoDefaultBranch,

    #[error("clone task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure while clearing the clone destination
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("failed to inspect {}: {source}", .path.display())]
    Inspect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type CloneResult<T> = Result<T, CloneError>;
