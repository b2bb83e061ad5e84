//! Per-repository outcomes and the reporting seam.

use std::path::Path;

use slug_git::{GitError, GitOutput, RepoHandle};

/// Which phase produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Fetch,
    Checkout,
    Pull,
}

/// Result of one backend call for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Succeeded without printing anything.
    Quiet,
    /// Succeeded and printed diagnostics; for fetch this means refs moved.
    Updated { diagnostics: String },
    /// The backend failed. Sibling repositories are unaffected.
    Failed { error: String },
}

impl SyncOutcome {
    pub fn from_output(result: Result<GitOutput, GitError>) -> Self {
        match result {
            Ok(out) if out.has_diagnostics() => SyncOutcome::Updated {
                diagnostics: out.stderr,
            },
            Ok(_) => SyncOutcome::Quiet,
            Err(err) => SyncOutcome::Failed {
                error: err.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

/// An outcome tagged with its repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoOutcome {
    pub repo: RepoHandle,
    pub outcome: SyncOutcome,
}

/// Receives progress as it happens. Called from worker threads.
pub trait Reporter: Send + Sync {
    /// A post-fetch phase is about to start on `repos` repositories.
    fn phase_started(&self, _phase: Phase, _repos: usize) {}

    fn outcome(&self, _phase: Phase, _outcome: &RepoOutcome) {}

    fn removed(&self, _path: &Path) {}

    fn message(&self, _text: &str) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {}
