//! `slug fetch` — fetch every branch of repositories already cloned.

use anyhow::Result;
use clap::Args;
use slug_sync::{fetch, CancelToken, FetchOptions, PlanPolicy};

use super::{finish_fetch, patterns_or_all, CommonArgs, FetchFlags};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug fetch`.
#[derive(Args, Debug)]
pub struct FetchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchFlags,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

impl FetchArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(Some(&self.fetch))?;
        let opts = FetchOptions::all_branches(patterns_or_all(&self.patterns), PlanPolicy::default());
        let ctx = self.common.context(settings, cancel, ConsoleReporter::new());
        let report = fetch(&ctx, &opts)?;
        Ok(finish_fetch(&report))
    }
}
