//! Parallel fetch dispatch.
//!
//! One [`FetchJob`] per repository, one `fetch` call per job, no retries. A
//! backend error is converted into [`SyncOutcome::Failed`] at the worker
//! boundary and never reaches the coordinator as an `Err`.

use std::sync::Arc;

use slug_git::{RepoHandle, VcsBackend};

use crate::error::SyncError;
use crate::outcome::{Phase, RepoOutcome, Reporter, SyncOutcome};
use crate::planner::FetchSpec;
use crate::pool::{CancelToken, WorkerPool};

/// A repository paired with the refspecs it needs.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub repo: RepoHandle,
    pub spec: FetchSpec,
}

/// Everything the barrier returns.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<RepoOutcome>,
    pub dropped: usize,
    /// Jobs that panicked and produced no outcome.
    pub panicked: usize,
    pub cancelled: bool,
}

impl DispatchReport {
    /// Repositories whose fetch succeeded with diagnostics, sorted by path.
    pub fn updated(&self) -> Vec<RepoHandle> {
        let mut repos: Vec<RepoHandle> = self
            .outcomes
            .iter()
            .filter(|o| matches!(o.outcome, SyncOutcome::Updated { .. }))
            .map(|o| o.repo.clone())
            .collect();
        repos.sort_by(|a, b| a.work_tree().cmp(b.work_tree()));
        repos
    }

    /// Repositories whose fetch failed, with the backend text.
    pub fn failed(&self) -> Vec<(RepoHandle, String)> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                SyncOutcome::Failed { error } => Some((o.repo.clone(), error.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Fetch worker pool.
pub struct Dispatcher {
    pool: WorkerPool<FetchJob, RepoOutcome>,
}

impl Dispatcher {
    pub fn start(
        backend: Arc<dyn VcsBackend>,
        reporter: Arc<dyn Reporter>,
        jobs: usize,
        depth: u32,
        cancel: CancelToken,
    ) -> Result<Self, SyncError> {
        let pool = WorkerPool::spawn("slug-fetch", jobs, cancel, move |job: FetchJob| {
            let outcome = fetch_one(backend.as_ref(), &job, depth);
            reporter.outcome(Phase::Fetch, &outcome);
            outcome
        })?;
        Ok(Self { pool })
    }

    pub fn enqueue(&mut self, job: FetchJob) {
        tracing::debug!(
            repo = %job.repo.name(),
            refspecs = job.spec.branch_count(),
            "queued fetch"
        );
        self.pool.submit(job);
    }

    pub fn queued(&self) -> usize {
        self.pool.submitted()
    }

    /// Close input and block until every queued job is done or dropped.
    pub fn wait(self) -> DispatchReport {
        let report = self.pool.finish();
        if report.cancelled {
            tracing::warn!(dropped = report.dropped, "fetch interrupted");
        }
        if report.panicked > 0 {
            tracing::error!(panicked = report.panicked, "fetch jobs panicked");
        }
        DispatchReport {
            outcomes: report.results,
            dropped: report.dropped,
            panicked: report.panicked,
            cancelled: report.cancelled,
        }
    }
}

fn fetch_one(backend: &dyn VcsBackend, job: &FetchJob, depth: u32) -> RepoOutcome {
    let outcome = SyncOutcome::from_output(backend.fetch(&job.repo, job.spec.refspecs(), depth));
    if let SyncOutcome::Failed { error } = &outcome {
        tracing::warn!(repo = %job.repo.display_dir(), %error, "fetch failed");
    }
    RepoOutcome {
        repo: job.repo.clone(),
        outcome,
    }
}
