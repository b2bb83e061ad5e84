//! Commands built on top of [`crate::pipeline::fetch`].
//!
//! Each post-fetch phase (checkout, pull) runs through the same
//! [`WorkerPool`] as fetching, so the `jobs` limit and cancellation apply
//! uniformly.

use std::sync::Arc;

use slug_core::{layout, IndexFilter, RepoName};
use slug_git::{load_index, RepoHandle, VcsBackend};

use crate::error::SyncError;
use crate::outcome::{Phase, RepoOutcome, SyncOutcome};
use crate::pipeline::{fetch, init_repo, FetchOptions, FetchReport, SyncContext};
use crate::planner::PlanPolicy;
use crate::pool::WorkerPool;

/// Branch checked out after a fresh clone.
pub const CLONE_BRANCH: &str = "master";

/// A fetch followed by one per-repository phase.
#[derive(Debug, Default)]
pub struct PhaseReport {
    pub fetch: FetchReport,
    /// One entry per repository the phase ran on, in completion order.
    pub outcomes: Vec<RepoOutcome>,
    pub dropped: usize,
    pub panicked: usize,
    pub cancelled: bool,
}

impl PhaseReport {
    fn skipped(fetch: FetchReport) -> Self {
        Self {
            cancelled: fetch.cancelled,
            fetch,
            ..Self::default()
        }
    }

    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_failed()).count()
            + self.fetch.failed.len()
    }
}

/// Fetch, then check out `target` in every existing indexed clone.
///
/// Without a target the tracking ref of the first requested branch is used,
/// e.g. `origin/master`.
pub fn checkout(
    ctx: &SyncContext,
    opts: &FetchOptions,
    target: Option<&str>,
) -> Result<PhaseReport, SyncError> {
    let fetched = fetch(ctx, opts)?;
    if fetched.cancelled {
        return Ok(PhaseReport::skipped(fetched));
    }

    let target = match target {
        Some(target) => target.to_string(),
        None => {
            let branch = opts
                .branches
                .first()
                .map(String::as_str)
                .unwrap_or(CLONE_BRANCH);
            format!("{}/{}", ctx.settings.remote_name, branch)
        }
    };
    let repos: Vec<RepoHandle> = fetched
        .indexed
        .iter()
        .map(|name| ctx.handle(name))
        .filter(RepoHandle::exists)
        .collect();

    run_phase(ctx, Phase::Checkout, fetched, repos, move |backend, repo| {
        SyncOutcome::from_output(backend.checkout(repo, &target))
    })
}

/// Create and fetch every matching repository that has no local clone yet,
/// then check out [`CLONE_BRANCH`] in each one that received data.
pub fn clone(ctx: &SyncContext, repo_patterns: Vec<String>) -> Result<PhaseReport, SyncError> {
    let opts = FetchOptions::all_branches(
        repo_patterns,
        PlanPolicy {
            new_repos: true,
            omit_existing: true,
        },
    );
    let fetched = fetch(ctx, &opts)?;
    if fetched.cancelled {
        return Ok(PhaseReport::skipped(fetched));
    }
    let repos = fetched.updated.clone();
    run_phase(ctx, Phase::Checkout, fetched, repos, |backend, repo| {
        SyncOutcome::from_output(backend.checkout(repo, CLONE_BRANCH))
    })
}

/// Fetch every branch, then rebase onto upstream.
///
/// With `all` every existing matching clone is rebased; otherwise only the
/// ones whose fetch reported changes.
pub fn pull(
    ctx: &SyncContext,
    repo_patterns: Vec<String>,
    all: bool,
) -> Result<PhaseReport, SyncError> {
    let opts = FetchOptions::all_branches(repo_patterns, PlanPolicy::default());
    let fetched = fetch(ctx, &opts)?;
    if fetched.cancelled {
        return Ok(PhaseReport::skipped(fetched));
    }

    let repos: Vec<RepoHandle> = if all {
        let mut repos: Vec<RepoHandle> = fetched
            .indexed
            .iter()
            .map(|name| ctx.handle(name))
            .filter(RepoHandle::exists)
            .collect();
        repos.sort_by(|a, b| a.work_tree().cmp(b.work_tree()));
        repos
    } else {
        fetched.updated.clone()
    };

    run_phase(ctx, Phase::Pull, fetched, repos, |backend, repo| {
        rebase_onto_upstream(backend, repo)
    })
}

fn rebase_onto_upstream(backend: &dyn VcsBackend, repo: &RepoHandle) -> SyncOutcome {
    let upstream = match backend.upstream_commit(repo) {
        Ok(sha) => sha,
        Err(err) => {
            return SyncOutcome::Failed {
                error: err.to_string(),
            }
        }
    };
    match backend.rebase(repo, &upstream) {
        Ok(out) if !out.stdout.trim().is_empty() => SyncOutcome::Updated {
            diagnostics: out.stdout,
        },
        Ok(_) => SyncOutcome::Quiet,
        Err(err) => SyncOutcome::Failed {
            error: err.to_string(),
        },
    }
}

/// Names of indexed repositories matching the filters. No network traffic
/// besides reading the index, no local changes.
pub fn list<B: AsRef<str>, R: AsRef<str>>(
    ctx: &SyncContext,
    branches: &[B],
    repo_patterns: &[R],
) -> Result<Vec<RepoName>, SyncError> {
    let filter = IndexFilter::new(branches, repo_patterns)?;
    let index = load_index(ctx.index.as_ref(), &filter)?;
    Ok(index.repos().cloned().collect())
}

/// Initialize local clones for `names` without fetching. Runs serially.
pub fn init_local(ctx: &SyncContext, names: &[RepoName]) -> Vec<RepoOutcome> {
    names
        .iter()
        .map(|name| {
            let repo = ctx.handle(name);
            let outcome = match init_repo(ctx, &repo) {
                Ok(()) => SyncOutcome::Quiet,
                Err(error) => SyncOutcome::Failed { error },
            };
            RepoOutcome { repo, outcome }
        })
        .collect()
}

/// `true` when `name` can be used as a directory under the packages dir.
pub fn is_valid_repo_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name != layout::GIT_DIR_NAME
        && !name.contains('/')
        && !name.chars().any(char::is_whitespace)
}

fn run_phase<F>(
    ctx: &SyncContext,
    phase: Phase,
    fetch: FetchReport,
    repos: Vec<RepoHandle>,
    op: F,
) -> Result<PhaseReport, SyncError>
where
    F: Fn(&dyn VcsBackend, &RepoHandle) -> SyncOutcome + Send + Sync + 'static,
{
    ctx.reporter.phase_started(phase, repos.len());
    let backend = Arc::clone(&ctx.backend);
    let reporter = Arc::clone(&ctx.reporter);
    let mut pool = WorkerPool::spawn(
        phase_pool_name(phase),
        ctx.settings.jobs,
        ctx.cancel.clone(),
        move |repo: RepoHandle| {
            let outcome = RepoOutcome {
                outcome: op(backend.as_ref(), &repo),
                repo,
            };
            if let SyncOutcome::Failed { error } = &outcome.outcome {
                tracing::warn!(repo = %outcome.repo.display_dir(), ?phase, %error, "phase failed");
            }
            reporter.outcome(phase, &outcome);
            outcome
        },
    )?;
    for repo in repos {
        pool.submit(repo);
    }
    let done = pool.finish();
    Ok(PhaseReport {
        fetch,
        outcomes: done.results,
        dropped: done.dropped,
        panicked: done.panicked,
        cancelled: done.cancelled,
    })
}

fn phase_pool_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Init => "slug-init",
        Phase::Fetch => "slug-fetch",
        Phase::Checkout => "slug-checkout",
        Phase::Pull => "slug-pull",
    }
}
