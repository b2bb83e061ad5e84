//! `slug pull` — fetch, then rebase local branches onto upstream.

use anyhow::Result;
use clap::Args;
use slug_sync::{phases, CancelToken};

use super::{finish_phase, patterns_or_all, CommonArgs, FetchFlags};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub fetch: FetchFlags,

    /// Rebase every local repository (default).
    #[arg(long, overrides_with = "noall")]
    pub all: bool,

    /// Rebase only repositories where the fetch brought something new.
    #[arg(long, overrides_with = "all")]
    pub noall: bool,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

impl PullArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(Some(&self.fetch))?;
        let ctx = self.common.context(settings, cancel, ConsoleReporter::new());
        let report = phases::pull(&ctx, patterns_or_all(&self.patterns), !self.noall)?;
        Ok(finish_phase(&report))
    }
}
