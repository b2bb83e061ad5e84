//! slug — keep a fleet of package git repositories in sync with upstream.
//!
//! # Usage
//!
//! ```text
//! slug update   [-b BRANCH]... [-n|--newpkgs|--nonewpkgs] [-P] [PATTERN]...
//! slug fetch    [PATTERN]...
//! slug clone    [PATTERN]...
//! slug checkout [-b BRANCH]... [-c REF] [-P] [PATTERN]...
//! slug pull     [--all|--noall] [PATTERN]...
//! slug list     [-b BRANCH]... [--json] [PATTERN]...
//! slug init     NAME...
//! ```
//!
//! Exit status: 0 on success (per-repository failures are reported but do
//! not change it), 1 when the index is unusable, 2 when no repository matched,
//! 130 when interrupted.

mod commands;
mod report;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use slug_sync::{CancelToken, SyncError};

use commands::{
    checkout::CheckoutArgs, clone::CloneArgs, fetch::FetchArgs, init::InitArgs, list::ListArgs,
    pull::PullArgs, update::UpdateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "slug",
    version,
    about = "Synchronize a fleet of package repositories with their upstream",
    long_about = None,
)]
struct Cli {
    /// Log progress to stderr (repeat for debug output).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch the configured branches of every matching repository.
    Update(UpdateArgs),

    /// Fetch all branches of repositories already cloned.
    Fetch(FetchArgs),

    /// Clone matching repositories that are not present locally.
    Clone(CloneArgs),

    /// Fetch, then check out a ref in every matching repository.
    Checkout(CheckoutArgs),

    /// Fetch, then rebase local branches onto upstream.
    Pull(PullArgs),

    /// Print the names of matching repositories.
    List(ListArgs),

    /// Create repositories on the server and initialize local clones.
    Init(InitArgs),
}

/// How a successful command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Interrupted,
}

impl Completion {
    pub fn from_cancelled(cancelled: bool) -> Self {
        if cancelled {
            Completion::Interrupted
        } else {
            Completion::Finished
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancelToken::new();
    if let Err(err) = install_interrupt_handler(&cancel) {
        tracing::warn!(error = %err, "cannot install interrupt handler");
    }

    match run(cli.command, &cancel) {
        Ok(Completion::Finished) => ExitCode::SUCCESS,
        Ok(Completion::Interrupted) => {
            eprintln!("Interrupted");
            ExitCode::from(130)
        }
        Err(err) => exit_for_error(&err),
    }
}

fn run(command: Commands, cancel: &CancelToken) -> Result<Completion> {
    match command {
        Commands::Update(args) => args.run(cancel),
        Commands::Fetch(args) => args.run(cancel),
        Commands::Clone(args) => args.run(cancel),
        Commands::Checkout(args) => args.run(cancel),
        Commands::Pull(args) => args.run(cancel),
        Commands::List(args) => args.run(cancel),
        Commands::Init(args) => args.run(cancel),
    }
}

fn exit_for_error(err: &anyhow::Error) -> ExitCode {
    if err
        .downcast_ref::<SyncError>()
        .is_some_and(SyncError::is_no_match)
    {
        eprintln!("No matching package has been found");
        return ExitCode::from(2);
    }
    eprintln!("error: {err:#}");
    ExitCode::FAILURE
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// First SIGINT sets the token; a second one terminates the process.
fn install_interrupt_handler(cancel: &CancelToken) -> std::io::Result<()> {
    use signal_hook::consts::SIGINT;
    use signal_hook::flag;

    let flag = cancel.flag();
    flag::register_conditional_default(SIGINT, flag.clone())?;
    flag::register(SIGINT, flag)?;
    Ok(())
}
