//! `slug update` — fetch the configured branches.

use anyhow::Result;
use clap::Args;
use slug_sync::{fetch, CancelToken, FetchOptions};

use super::{finish_fetch, patterns_or_all, CommonArgs, FetchFlags};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchFlags,

    /// Branch to fetch. Repeat for several; replaces the configured list.
    #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
    pub branches: Vec<String>,

    /// Initialize repositories that do not exist locally.
    #[arg(short = 'n', long = "newpkgs", overrides_with = "no_new_pkgs")]
    pub new_pkgs: bool,

    /// Skip repositories that do not exist locally.
    #[arg(long = "nonewpkgs", overrides_with = "new_pkgs")]
    pub no_new_pkgs: bool,

    /// Remove local repositories that no longer exist upstream.
    #[arg(short = 'P', long)]
    pub prune: bool,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

impl UpdateArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(Some(&self.fetch))?;
        let mut opts = FetchOptions::from_settings(&settings);
        if !self.branches.is_empty() {
            opts.branches = self.branches.clone();
        }
        if !self.patterns.is_empty() {
            opts.repo_patterns = patterns_or_all(&self.patterns);
        }
        if self.new_pkgs {
            opts.policy.new_repos = true;
        } else if self.no_new_pkgs {
            opts.policy.new_repos = false;
        }
        opts.prune |= self.prune;

        let ctx = self.common.context(settings, cancel, ConsoleReporter::new());
        let report = fetch(&ctx, &opts)?;
        Ok(finish_fetch(&report))
    }
}
