//! Subcommand implementations and the flags they share.

pub mod checkout;
pub mod clone;
pub mod fetch;
pub mod init;
pub mod list;
pub mod pull;
pub mod update;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use slug_core::{config, Settings};
use slug_git::{ArchiveIndex, FileIndex, GitCli, IndexSource};
use slug_sync::{CancelToken, FetchReport, PhaseReport, SyncContext};

use crate::report::ConsoleReporter;
use crate::Completion;

/// Flags accepted by every subcommand that reads the index.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Local directory holding the repositories.
    #[arg(short = 'd', long = "packagesdir", value_name = "DIR")]
    pub packages_dir: Option<PathBuf>,

    /// Read the reference index from FILE (`-` for stdin) instead of the
    /// index repository.
    #[arg(long, value_name = "FILE")]
    pub index_file: Option<PathBuf>,
}

/// Flags for subcommands that fetch.
#[derive(Args, Debug, Clone, Default)]
pub struct FetchFlags {
    /// Number of parallel workers.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Fetch depth, 0 for full history.
    #[arg(long)]
    pub depth: Option<u32>,
}

impl CommonArgs {
    /// Settings from the config file with command-line overrides applied.
    pub fn settings(&self, fetch: Option<&FetchFlags>) -> Result<Settings> {
        let mut settings = config::load().context("failed to load slug configuration")?;
        if let Some(dir) = &self.packages_dir {
            settings.packages_dir = dir.clone();
        }
        if let Some(flags) = fetch {
            if let Some(jobs) = flags.jobs {
                settings.jobs = jobs.max(1);
            }
            if let Some(depth) = flags.depth {
                settings.depth = depth;
            }
        }
        Ok(settings)
    }

    pub fn context(
        &self,
        settings: Settings,
        cancel: &CancelToken,
        reporter: ConsoleReporter,
    ) -> SyncContext {
        let git = GitCli::new(settings.remote_name.clone());
        let index: Arc<dyn IndexSource> = match &self.index_file {
            Some(path) => Arc::new(FileIndex::new(path.clone())),
            None => Arc::new(ArchiveIndex::new(git.clone(), settings.refs_repo_url())),
        };
        tracing::debug!(index = %index.describe(), packages = %settings.packages_dir.display(), "context ready");
        SyncContext {
            settings,
            backend: Arc::new(git),
            index,
            reporter: Arc::new(reporter),
            cancel: cancel.clone(),
        }
    }
}

/// Log the run summary and turn the cancellation flag into a completion.
pub fn finish_fetch(report: &FetchReport) -> Completion {
    tracing::info!(
        indexed = report.indexed.len(),
        initialized = report.initialized.len(),
        updated = report.updated.len(),
        current = report.current,
        pruned = report.pruned.len(),
        "update finished"
    );
    print_skipped(report);
    print_failure_count(report.failed.len());
    print_panic_count(report.panicked);
    Completion::from_cancelled(report.cancelled)
}

pub fn finish_phase(report: &PhaseReport) -> Completion {
    print_skipped(&report.fetch);
    print_failure_count(report.failures());
    print_panic_count(report.fetch.panicked + report.panicked);
    Completion::from_cancelled(report.cancelled)
}

/// One line per requested repository the run did not touch.
fn print_skipped(report: &FetchReport) {
    for line in skipped_lines(report) {
        println!("{line}");
    }
}

fn skipped_lines(report: &FetchReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .skipped_missing
        .iter()
        .map(|name| format!("{name}: not cloned locally, skipped (use -n to clone)"))
        .collect();
    let existing = report.skipped_existing.len();
    if existing > 0 {
        lines.push(format!("{existing} repositories already cloned, skipped"));
    }
    lines
}

fn print_panic_count(panicked: usize) {
    if panicked > 0 {
        eprintln!(
            "{}",
            format!("{panicked} repositories were abandoned after a worker crash").red()
        );
    }
}

fn print_failure_count(failed: usize) {
    if failed > 0 {
        eprintln!(
            "{}",
            format!("{failed} repositories reported errors").yellow()
        );
    }
}

/// Repository globs; none means every repository.
pub fn patterns_or_all(patterns: &[String]) -> Vec<String> {
    if patterns.is_empty() {
        vec!["*".to_string()]
    } else {
        patterns.to_vec()
    }
}
