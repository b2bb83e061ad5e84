//! Error types for slug-sync.

use std::path::PathBuf;

use thiserror::Error;

use slug_core::IndexError;
use slug_git::GitError;

/// Errors that abort a whole run. Per-repository failures never surface here;
/// they are recorded as [`crate::SyncOutcome::Failed`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The reference index could not be obtained, parsed, or matched nothing.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A backend failure outside any single repository's work item.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS refused to start a worker thread.
    #[error("cannot start worker thread: {0}")]
    Worker(#[source] std::io::Error),
}

impl SyncError {
    /// `true` when filtering matched no repository.
    pub fn is_no_match(&self) -> bool {
        matches!(self, SyncError::Index(err) if err.is_no_match())
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
