//! `slug checkout` — fetch, then check out one ref everywhere.

use anyhow::Result;
use clap::Args;
use slug_sync::{phases, CancelToken, FetchOptions};

use super::{finish_phase, patterns_or_all, CommonArgs, FetchFlags};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug checkout`.
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchFlags,

    /// Branch to fetch. Repeat for several; replaces the configured list.
    #[arg(short = 'b', long = "branch", value_name = "BRANCH")]
    pub branches: Vec<String>,

    /// Ref to check out. Defaults to `<remote>/<first branch>`.
    #[arg(short = 'c', long = "checkout", value_name = "REF")]
    pub target: Option<String>,

    /// Remove local repositories that no longer exist upstream.
    #[arg(short = 'P', long)]
    pub prune: bool,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

impl CheckoutArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(Some(&self.fetch))?;
        let mut opts = FetchOptions::from_settings(&settings);
        if !self.branches.is_empty() {
            opts.branches = self.branches.clone();
        }
        if !self.patterns.is_empty() {
            opts.repo_patterns = patterns_or_all(&self.patterns);
        }
        opts.policy.new_repos = true;
        opts.prune |= self.prune;

        let shown_target = match &self.target {
            Some(target) => target.clone(),
            None => format!(
                "{}/{}",
                settings.remote_name,
                opts.branches.first().map(String::as_str).unwrap_or(phases::CLONE_BRANCH)
            ),
        };
        let reporter = ConsoleReporter::new().with_checkout_target(shown_target);
        let ctx = self.common.context(settings, cancel, reporter);
        let report = phases::checkout(&ctx, &opts, self.target.as_deref())?;
        Ok(finish_phase(&report))
    }
}
