//! Error types for slug-git.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a version-control backend.
#[derive(Debug, Error)]
pub enum GitError {
    /// The command ran and exited non-zero. `output` is stdout followed by
    /// stderr, as printed for the user.
    #[error("{output}")]
    Command {
        args: Vec<String>,
        status: Option<i32>,
        output: String,
    },

    /// The program could not be started at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// `git init` itself failed.
    #[error("cannot initialize repository at {path}")]
    Init { path: PathBuf },
}

/// Why an index archive stream could not yield its index member.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The gzip or tar framing is broken.
    #[error("unreadable archive: {0}")]
    Unreadable(#[source] std::io::Error),

    /// The first real member is not the index file.
    #[error("expected member {expected:?}, found {found:?}")]
    UnexpectedMember { expected: String, found: String },

    /// The member exists but its contents could not be read as text.
    #[error("cannot read {member}: {source}")]
    Member {
        member: String,
        #[source]
        source: std::io::Error,
    },

    /// The archive has no members besides pax headers.
    #[error("archive does not contain {0:?}")]
    Missing(String),
}
