//! Terminal output for engine progress.

use std::path::Path;

use colored::Colorize;
use slug_sync::{Phase, RepoOutcome, Reporter, SyncOutcome};

/// Prints per-repository results as they arrive from worker threads.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    checkout_target: Option<String>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the ref being checked out in checkout failure lines.
    pub fn with_checkout_target(mut self, target: impl Into<String>) -> Self {
        self.checkout_target = Some(target.into());
        self
    }
}

impl Reporter for ConsoleReporter {
    fn phase_started(&self, phase: Phase, _repos: usize) {
        if phase == Phase::Pull {
            println!("{}", "--------Pulling------------".bold());
        }
    }

    fn outcome(&self, phase: Phase, outcome: &RepoOutcome) {
        let repo = &outcome.repo;
        match (phase, &outcome.outcome) {
            (Phase::Fetch, SyncOutcome::Updated { diagnostics }) => {
                println!("{}\n{}", banner(&repo.display_dir()).cyan(), diagnostics.trim_end());
            }
            (Phase::Fetch, SyncOutcome::Failed { error }) => {
                println!("{}\n{}", banner(&repo.display_dir()).red(), error.trim_end());
            }
            (Phase::Pull, SyncOutcome::Updated { diagnostics }) => {
                print!("{}", prefix_lines(repo.name().as_str(), " : ", diagnostics));
            }
            (Phase::Pull, SyncOutcome::Failed { error }) => {
                eprint!("{}", prefix_lines(repo.name().as_str(), ": ", error));
            }
            (Phase::Checkout, SyncOutcome::Failed { error }) => {
                let target = self.checkout_target.as_deref().unwrap_or("master");
                eprintln!(
                    "{} {} in repo {}: {}",
                    "Problem with checking branch".red(),
                    target,
                    repo.git_dir().display(),
                    error.trim_end()
                );
            }
            (Phase::Init, SyncOutcome::Failed { error }) => {
                eprintln!("{}: {}", repo.display_dir().red(), error.trim_end());
            }
            _ => {}
        }
    }

    fn removed(&self, path: &Path) {
        println!("{} {}", "Removing".yellow(), path.display());
    }

    fn message(&self, text: &str) {
        println!("{text}");
    }
}

fn banner(dir: &str) -> String {
    format!("------ {dir} ------")
}

/// `dir<sep>line` for every line of `text`.
fn prefix_lines(dir: &str, sep: &str, text: &str) -> String {
    text.lines().map(|line| format!("{dir}{sep}{line}\n")).collect()
}
