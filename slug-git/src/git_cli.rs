//! [`VcsBackend`] implemented by running the `git` executable.
//!
//! Every command is run with explicit `--git-dir` and `--work-tree` so the
//! caller's working directory never matters. On Unix each child is placed in
//! its own process group: a terminal interrupt reaches slug but not the
//! in-flight `git`, which is allowed to finish before the run stops.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use slug_core::{layout, CommitId};

use crate::backend::{GitOutput, VcsBackend};
use crate::error::GitError;
use crate::handle::RepoHandle;
use crate::probe::{FsRefProbe, RefProbe};

/// The `git` subprocess backend.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    remote: String,
    probe: FsRefProbe,
}

impl GitCli {
    pub fn new(remote: impl Into<String>) -> Self {
        let remote = remote.into();
        Self {
            program: PathBuf::from("git"),
            probe: FsRefProbe::new(remote.clone()),
            remote,
        }
    }

    /// Use a specific `git` executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A bare `git` command not bound to any repository.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        isolate_from_terminal_signals(&mut cmd);
        cmd
    }

    fn repo_command(&self, repo: &RepoHandle) -> Command {
        let mut cmd = self.command();
        cmd.arg(prefixed("--git-dir=", repo.git_dir()))
            .arg(prefixed("--work-tree=", repo.work_tree()));
        cmd
    }

    /// Run `git <args>` in `repo` and fail on non-zero exit.
    pub fn run_checked(&self, repo: &RepoHandle, args: &[&str]) -> Result<GitOutput, GitError> {
        let mut cmd = self.repo_command(repo);
        cmd.args(args);
        let output = self.spawn_output(&mut cmd)?;
        into_result(args, output)
    }

    fn spawn_output(&self, cmd: &mut Command) -> Result<Output, GitError> {
        tracing::debug!(command = ?cmd, "running git");
        cmd.stdin(Stdio::null())
            .output()
            .map_err(|source| GitError::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }

    fn init_git_dir(&self, repo: &RepoHandle) -> Result<(), GitError> {
        let mut cmd = self.command();
        cmd.arg("init");
        if repo.git_dir().parent() == Some(repo.work_tree()) {
            cmd.arg(repo.work_tree());
        } else {
            cmd.arg("--bare").arg(repo.git_dir());
        }
        let output = self.spawn_output(&mut cmd)?;
        if !output.status.success() {
            return Err(GitError::Init {
                path: repo.git_dir().to_path_buf(),
            });
        }
        Ok(())
    }
}

impl RefProbe for GitCli {
    fn read_local_ref(&self, repo: &RepoHandle, upstream_ref: &str) -> CommitId {
        self.probe.read_local_ref(repo, upstream_ref)
    }
}

impl VcsBackend for GitCli {
    fn fetch(
        &self,
        repo: &RepoHandle,
        refspecs: &[String],
        depth: u32,
    ) -> Result<GitOutput, GitError> {
        let depth_arg = format!("--depth={depth}");
        let mut args: Vec<&str> = vec!["fetch"];
        if depth > 0 {
            args.push(&depth_arg);
        }
        args.push(&self.remote);
        args.extend(refspecs.iter().map(String::as_str));
        self.run_checked(repo, &args)
    }

    fn checkout(&self, repo: &RepoHandle, branch: &str) -> Result<GitOutput, GitError> {
        self.run_checked(repo, &["checkout", "-m", branch])
    }

    fn init(
        &self,
        repo: &RepoHandle,
        pull_url: &str,
        push_url: Option<&str>,
    ) -> Result<(), GitError> {
        if repo.exists() {
            tracing::debug!(
                git_dir = %repo.git_dir().display(),
                "reinitializing existing repository"
            );
        }
        self.init_git_dir(repo)?;

        let remote = self.remote.as_str();
        if self
            .run_checked(repo, &["remote", "add", remote, pull_url])
            .is_err()
        {
            self.run_checked(repo, &["remote", "set-url", remote, pull_url])?;
        }
        if let Some(push_url) = push_url {
            self.run_checked(repo, &["remote", "set-url", "--push", remote, push_url])?;
        }
        let key = format!("remote.{remote}.fetch");
        self.run_checked(
            repo,
            &[
                "config",
                "--local",
                "--replace-all",
                &key,
                layout::NOTES_REFSPEC,
                "^refs/notes/",
            ],
        )?;
        Ok(())
    }

    fn upstream_commit(&self, repo: &RepoHandle) -> Result<CommitId, GitError> {
        let args = ["rev-parse", "-q", "--verify", "@{u}"];
        let out = self.run_checked(repo, &args)?;
        let sha = out.stdout.trim();
        CommitId::parse(sha).ok_or_else(|| GitError::Command {
            args: args.iter().map(|a| a.to_string()).collect(),
            status: Some(0),
            output: format!("unexpected rev-parse output: {sha:?}"),
        })
    }

    fn rebase(&self, repo: &RepoHandle, onto: &CommitId) -> Result<GitOutput, GitError> {
        self.run_checked(repo, &["rebase", onto.as_str()])
    }
}

/// Create `name` on the server: `ssh <destination> create <name>`.
///
/// The server-side command is an administrative shell, not `git`; a non-zero
/// exit is reported with whatever it printed.
pub fn create_remote_repository(ssh_destination: &str, name: &str) -> Result<(), GitError> {
    let args = [ssh_destination, "create", name];
    let output = Command::new("ssh")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| GitError::Spawn {
            program: "ssh".to_string(),
            source,
        })?;
    into_result(&args, output).map(|_| ())
}

fn into_result(args: &[&str], output: Output) -> Result<GitOutput, GitError> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if output.status.success() {
        Ok(GitOutput { stdout, stderr })
    } else {
        Err(GitError::Command {
            args: args.iter().map(|a| a.to_string()).collect(),
            status: output.status.code(),
            output: format!("{stdout}{stderr}"),
        })
    }
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

#[cfg(unix)]
fn isolate_from_terminal_signals(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate_from_terminal_signals(_cmd: &mut Command) {}
