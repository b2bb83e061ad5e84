//! The operation set the sync engine needs from a version-control backend.

use slug_core::CommitId;

use crate::error::GitError;
use crate::handle::RepoHandle;
use crate::probe::RefProbe;

/// Captured output of a successful backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// `true` when the backend printed diagnostics. For `fetch` this means
    /// refs were actually updated (git reports updates on stderr).
    pub fn has_diagnostics(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Per-repository operations. Every call is blocking and touches exactly one
/// repository, so one backend can be shared by many worker threads.
pub trait VcsBackend: RefProbe {
    /// `git fetch [--depth=N] <remote> <refspecs...>`. `depth == 0` fetches
    /// full history.
    fn fetch(&self, repo: &RepoHandle, refspecs: &[String], depth: u32)
        -> Result<GitOutput, GitError>;

    /// `git checkout -m <branch>`.
    fn checkout(&self, repo: &RepoHandle, branch: &str) -> Result<GitOutput, GitError>;

    /// Create the metadata directory, register the remote and configure notes
    /// fetching. Warns, but succeeds, when the directory already existed.
    fn init(
        &self,
        repo: &RepoHandle,
        pull_url: &str,
        push_url: Option<&str>,
    ) -> Result<(), GitError>;

    /// Commit of the current branch's upstream (`@{u}`).
    fn upstream_commit(&self, repo: &RepoHandle) -> Result<CommitId, GitError>;

    /// `git rebase <onto>`.
    fn rebase(&self, repo: &RepoHandle, onto: &CommitId) -> Result<GitOutput, GitError>;
}
