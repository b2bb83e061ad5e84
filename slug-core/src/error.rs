//! Error types for slug-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building or reading the reference index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// A line did not split into exactly `commit ref repository`.
    #[error("malformed reference index line {line_no}: expected 3 fields, got {line:?}")]
    Malformed { line_no: usize, line: String },

    /// The commit field was neither a hex object id nor the empty sentinel.
    #[error("invalid commit id {commit:?} on reference index line {line_no}")]
    InvalidCommit { line_no: usize, commit: String },

    /// Filtering left no repository at all. Not a corruption: callers report
    /// it to the user and exit with a distinct status.
    #[error("no matching package has been found")]
    NoMatchedRepos,

    /// A branch or repository glob could not be compiled.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The index transport failed (archive unreadable, wrong member, export
    /// process exited non-zero).
    #[error("problem with file {file} in repository {repository}: {reason}")]
    Unavailable {
        file: String,
        repository: String,
        reason: String,
    },

    /// Underlying read failure on the index stream.
    #[error("I/O error reading reference index: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// `true` for the "nothing matched" outcome, which is not a failure of
    /// the index itself.
    pub fn is_no_match(&self) -> bool {
        matches!(self, IndexError::NoMatchedRepos)
    }
}

/// Errors from loading `Settings`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with the file path and serde_yaml line context.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
