//! `slug clone` — create local clones of repositories not yet present.

use anyhow::Result;
use clap::Args;
use slug_sync::{phases, CancelToken};

use super::{finish_phase, patterns_or_all, CommonArgs, FetchFlags};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug clone`.
#[derive(Args, Debug)]
pub struct CloneArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchFlags,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

impl CloneArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(Some(&self.fetch))?;
        let reporter = ConsoleReporter::new().with_checkout_target(phases::CLONE_BRANCH);
        let ctx = self.common.context(settings, cancel, reporter);
        let report = phases::clone(&ctx, patterns_or_all(&self.patterns))?;
        Ok(finish_phase(&report))
    }
}
