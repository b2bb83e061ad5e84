//! `slug init` — create repositories upstream and locally.

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use slug_core::RepoName;
use slug_git::create_remote_repository;
use slug_sync::{phases, CancelToken};

use super::CommonArgs;
use crate::report::ConsoleReporter;
use crate::Completion;

/// Arguments for `slug init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Only initialize local clones; do not contact the server.
    #[arg(long)]
    pub local_only: bool,

    /// Names of the repositories to create.
    #[arg(required = true, value_name = "NAME")]
    pub names: Vec<String>,
}

impl InitArgs {
    pub fn run(self, cancel: &CancelToken) -> Result<Completion> {
        if let Some(bad) = self.names.iter().find(|n| !phases::is_valid_repo_name(n)) {
            bail!("invalid repository name '{bad}'");
        }
        let settings = self.common.settings(None)?;
        let ssh_destination = settings.ssh_destination();
        let ctx = self.common.context(settings, cancel, ConsoleReporter::new());

        for name in &self.names {
            if cancel.is_cancelled() {
                return Ok(Completion::Interrupted);
            }
            if !self.local_only {
                if let Err(err) = create_remote_repository(&ssh_destination, name) {
                    eprintln!(
                        "{} {name}: {}",
                        "cannot create upstream repository".red(),
                        err.to_string().trim_end()
                    );
                }
            }
            for done in phases::init_local(&ctx, &[RepoName::from(name.as_str())]) {
                if !done.outcome.is_failed() {
                    println!("{} {}", "Initialized".green(), done.repo.display_dir());
                }
            }
        }
        Ok(Completion::Finished)
    }
}
