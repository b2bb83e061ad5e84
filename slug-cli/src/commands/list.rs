//! `slug list` — print repositories matching the filters.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use slug_core::RepoName;
use slug_sync::{phases, CancelToken};

use super::{patterns_or_all, CommonArgs};
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only repositories having this branch. Repeat for several.
    #[arg(short = 'b', long = "branch", value_name = "BRANCH", default_value = "*")]
    pub branches: Vec<String>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,

    /// Repository name globs.
    pub patterns: Vec<String>,
}

#[derive(Serialize)]
struct ListJson<'a> {
    count: usize,
    repositories: &'a [RepoName],
}

impl ListArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        let settings = self.common.settings(None)?;
        let ctx = self.common.context(settings, cancel, ConsoleReporter::new());
        let names = phases::list(&ctx, &self.branches, &patterns_or_all(&self.patterns))?;

        if self.json {
            let payload = ListJson {
                count: names.len(),
                repositories: &names,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to encode list")?
            );
        } else {
            for name in &names {
                println!("{name}");
            }
        }
        Ok(Completion::Finished)
    }
}
