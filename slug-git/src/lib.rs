//! Version-control collaborators for the slug sync engine.
//!
//! - [`handle`] — [`RepoHandle`], one local clone
//! - [`probe`] — [`RefProbe`]: which commit a remote-tracking ref points at
//! - [`backend`] — [`VcsBackend`]: fetch / checkout / init / rebase
//! - [`git_cli`] — [`GitCli`], the `git` subprocess implementation
//! - [`transport`] — where the reference index text comes from

pub mod backend;
pub mod error;
pub mod git_cli;
pub mod handle;
pub mod probe;
pub mod transport;

pub use backend::{GitOutput, VcsBackend};
pub use error::{ArchiveError, GitError};
pub use git_cli::{create_remote_repository, GitCli};
pub use handle::RepoHandle;
pub use probe::{FsRefProbe, MemoryRefProbe, RefProbe};
pub use transport::{load_index, ArchiveIndex, FileIndex, IndexSource, InlineIndex};
