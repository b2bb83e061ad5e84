//! The fetch pipeline shared by every network-touching command.
//!
//! Order is fixed: load index, classify and plan each repository, dispatch
//! fetches, wait at the barrier, then prune if asked to. Nothing after the
//! barrier runs until every dispatched fetch has finished or been dropped.

use std::path::PathBuf;
use std::sync::Arc;

use slug_core::{IndexFilter, PatternSet, RepoName, Settings};
use slug_git::{load_index, IndexSource, RepoHandle, VcsBackend};

use crate::dispatcher::{Dispatcher, FetchJob};
use crate::error::SyncError;
use crate::outcome::{Phase, RepoOutcome, Reporter, SyncOutcome};
use crate::planner::{plan, Eligibility, PlanPolicy};
use crate::pool::CancelToken;
use crate::pruner;

/// Everything a run needs. Built once by the caller and shared by phases.
#[derive(Clone)]
pub struct SyncContext {
    pub settings: Settings,
    pub backend: Arc<dyn VcsBackend>,
    pub index: Arc<dyn IndexSource>,
    pub reporter: Arc<dyn Reporter>,
    pub cancel: CancelToken,
}

impl SyncContext {
    pub fn handle(&self, name: &RepoName) -> RepoHandle {
        RepoHandle::in_packages(&self.settings.packages_dir, name)
    }

    fn remote(&self) -> &str {
        &self.settings.remote_name
    }
}

/// What a single fetch run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub branches: Vec<String>,
    pub repo_patterns: Vec<String>,
    pub policy: PlanPolicy,
    pub prune: bool,
}

impl FetchOptions {
    /// The `update` defaults taken from settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            branches: settings.branches.clone(),
            repo_patterns: settings.repo_patterns.clone(),
            policy: PlanPolicy {
                new_repos: settings.new_repos,
                omit_existing: false,
            },
            prune: settings.prune,
        }
    }

    /// Every branch of every matching repository, no pruning.
    pub fn all_branches(repo_patterns: Vec<String>, policy: PlanPolicy) -> Self {
        Self {
            branches: vec!["*".to_string()],
            repo_patterns,
            policy,
            prune: false,
        }
    }
}

/// Summary of one fetch run.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Repositories that survived filtering, in index order.
    pub indexed: Vec<RepoName>,
    /// Clones created this run.
    pub initialized: Vec<RepoName>,
    /// Absent locally and creation was not enabled.
    pub skipped_missing: Vec<RepoName>,
    /// Present locally but only new clones were wanted.
    pub skipped_existing: Vec<RepoName>,
    /// Planned but already up to date.
    pub current: usize,
    pub dispatched: usize,
    /// Fetched with diagnostics, sorted by path.
    pub updated: Vec<RepoHandle>,
    /// Init or fetch failures with the backend text.
    pub failed: Vec<(RepoHandle, String)>,
    /// Queued but never started.
    pub dropped: usize,
    /// Fetch jobs that panicked. No outcome was recorded for them.
    pub panicked: usize,
    pub pruned: Vec<PathBuf>,
    pub cancelled: bool,
}

/// Run one fetch pass.
///
/// Fails only when the index cannot be used; every per-repository problem
/// lands in [`FetchReport::failed`].
pub fn fetch(ctx: &SyncContext, opts: &FetchOptions) -> Result<FetchReport, SyncError> {
    let filter = IndexFilter::new(&opts.branches, &opts.repo_patterns)?;
    let index = load_index(ctx.index.as_ref(), &filter)?;
    ctx.reporter.message("Read remotes data");

    let mut report = FetchReport {
        indexed: index.repos().cloned().collect(),
        ..FetchReport::default()
    };

    let mut dispatcher = Dispatcher::start(
        Arc::clone(&ctx.backend),
        Arc::clone(&ctx.reporter),
        ctx.settings.jobs,
        ctx.settings.depth,
        ctx.cancel.clone(),
    )?;

    for name in index.repos() {
        if ctx.cancel.is_cancelled() {
            tracing::warn!("interrupted, no further repositories will be queued");
            break;
        }
        let repo = ctx.handle(name);
        match opts.policy.eligibility(&repo) {
            Eligibility::SkipMissing => {
                tracing::debug!(repo = %name, "not cloned locally, skipping");
                report.skipped_missing.push(name.clone());
                continue;
            }
            Eligibility::SkipExisting => {
                report.skipped_existing.push(name.clone());
                continue;
            }
            Eligibility::InitThenPlan => match init_repo(ctx, &repo) {
                Ok(()) => report.initialized.push(name.clone()),
                Err(error) => {
                    report.failed.push((repo, error));
                    continue;
                }
            },
            Eligibility::Plan => {}
        }

        match plan(&repo, index.refs(name.as_str()), ctx.backend.as_ref(), ctx.remote()) {
            Some(spec) => dispatcher.enqueue(FetchJob { repo, spec }),
            None => report.current += 1,
        }
    }

    report.dispatched = dispatcher.queued();
    let dispatch = dispatcher.wait();
    report.updated = dispatch.updated();
    report.failed.extend(dispatch.failed());
    report.dropped = dispatch.dropped;
    report.panicked = dispatch.panicked;
    report.cancelled = dispatch.cancelled || ctx.cancel.is_cancelled();

    tracing::info!(
        indexed = report.indexed.len(),
        dispatched = report.dispatched,
        updated = report.updated.len(),
        failed = report.failed.len(),
        "fetch finished"
    );

    if opts.prune {
        if report.cancelled {
            tracing::warn!("interrupted, pruning skipped");
        } else {
            let full = load_index(ctx.index.as_ref(), &IndexFilter::everything())?;
            let patterns = PatternSet::new(&opts.repo_patterns)?;
            report.pruned = pruner::prune(
                &ctx.settings.packages_dir,
                &patterns,
                &full,
                ctx.reporter.as_ref(),
            )?;
        }
    }

    Ok(report)
}

/// Create a local clone pointing at the configured remote.
///
/// The failure is reported and returned as text; it never aborts the run.
pub(crate) fn init_repo(ctx: &SyncContext, repo: &RepoHandle) -> Result<(), String> {
    if repo.work_tree().exists() {
        ctx.reporter.message(&format!(
            "WARNING: Directory {} already existed",
            repo.display_dir()
        ));
    }
    let name = repo.name().as_str();
    let push_url = ctx.settings.push_url(name);
    let result = ctx
        .backend
        .init(repo, &ctx.settings.pull_url(name), Some(&push_url));
    let outcome = match &result {
        Ok(()) => SyncOutcome::Quiet,
        Err(err) => {
            tracing::warn!(repo = %repo.display_dir(), error = %err, "init failed");
            SyncOutcome::Failed {
                error: err.to_string(),
            }
        }
    };
    ctx.reporter.outcome(
        Phase::Init,
        &RepoOutcome {
            repo: repo.clone(),
            outcome,
        },
    );
    result.map_err(|err| err.to_string())
}
