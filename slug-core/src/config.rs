//! User settings.
//!
//! # Storage layout
//!
//! ```text
//! ~/.slug/
//!   config.yaml   (optional — every key has a default)
//! ```
//!
//! ```yaml
//! packages_dir: ~/rpm/packages
//! jobs: 8
//! branches: [master]
//! new_repos: true
//! prune: false
//! ```
//!
//! # API pattern
//!
//! - `load_at(home: &Path)` — explicit home; used in tests with `TempDir`
//! - `load()` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::layout::DEFAULT_REMOTE;

/// Effective settings after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one clone per repository. `~` is expanded on load.
    pub packages_dir: PathBuf,
    /// Worker count for the fetch/checkout/pull pools.
    pub jobs: usize,
    /// `git fetch --depth`; `0` fetches full history.
    pub depth: u32,
    /// Branch globs fetched by `update` and `checkout`.
    pub branches: Vec<String>,
    /// Repository globs applied when none are given on the command line.
    pub repo_patterns: Vec<String>,
    /// Initialize clones for indexed repositories missing locally.
    pub new_repos: bool,
    /// Remove local clones that no longer exist upstream.
    pub prune: bool,
    pub remote_name: String,
    pub git_server: String,
    pub git_login: String,
    /// Repository on `git_server` exporting the reference index.
    pub refs_repo: String,
    pub pull_url_base: Option<String>,
    pub push_url_base: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from("~/rpm/packages"),
            jobs: default_jobs(),
            depth: 0,
            branches: vec!["master".to_string()],
            repo_patterns: vec!["*".to_string()],
            new_repos: false,
            prune: false,
            remote_name: DEFAULT_REMOTE.to_string(),
            git_server: "git.pld-linux.org".to_string(),
            git_login: "git@".to_string(),
            refs_repo: "Refs".to_string(),
            pull_url_base: None,
            push_url_base: None,
        }
    }
}

impl Settings {
    /// `git://<server>/<refs_repo>` — the index repository.
    pub fn refs_repo_url(&self) -> String {
        format!("git://{}/{}", self.git_server, self.refs_repo)
    }

    /// Pull URL for `repo`; `git://<server>/packages/<repo>` unless overridden.
    pub fn pull_url(&self, repo: &str) -> String {
        match &self.pull_url_base {
            Some(base) => join_url(base, repo),
            None => format!("git://{}/packages/{repo}", self.git_server),
        }
    }

    /// Push URL for `repo`; `<login><server>:packages/<repo>` unless overridden.
    pub fn push_url(&self, repo: &str) -> String {
        match &self.push_url_base {
            Some(base) => join_url(base, repo),
            None => format!("{}{}:packages/{repo}", self.git_login, self.git_server),
        }
    }

    /// `<login><server>` — the ssh destination for remote repository creation.
    pub fn ssh_destination(&self) -> String {
        format!("{}{}", self.git_login, self.git_server)
    }
}

/// Host CPU count, at least 1.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .max(1)
}

/// `<home>/.slug/config.yaml` — pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".slug").join("config.yaml")
}

/// Load settings rooted at `home`.
///
/// A missing file yields [`Settings::default`]. Unknown keys are ignored.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = settings_path_at(home);
    let mut settings = if path.exists() {
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        if contents.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(&contents)
                .map_err(|source| ConfigError::Parse { path, source })?
        }
    } else {
        Settings::default()
    };
    settings.packages_dir = expand_home(&settings.packages_dir, home);
    settings.jobs = settings.jobs.max(1);
    Ok(settings)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

/// `~` or `~/…` → `<home>/…`. Other paths are returned unchanged.
pub fn expand_home(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn join_url(base: &str, repo: &str) -> String {
    format!("{}/{repo}", base.trim_end_matches('/'))
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
