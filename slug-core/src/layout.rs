//! Naming conventions for local clones, remote-tracking refs and the index
//! repository.

use std::path::{Path, PathBuf};

/// Forty zeros: the commit id of a ref that does not exist.
pub const EMPTY_COMMIT: &str = "0000000000000000000000000000000000000000";

pub const HEADS_PREFIX: &str = "refs/heads/";
pub const NOTES_REFSPEC: &str = "refs/notes/*:refs/notes/*";

/// Name of the single file exported from the index repository.
pub const INDEX_FILE: &str = "heads";

pub const DEFAULT_REMOTE: &str = "origin";
pub const GIT_DIR_NAME: &str = ".git";

/// `<packages_dir>/<repo>`
pub fn work_tree(packages_dir: &Path, repo: &str) -> PathBuf {
    packages_dir.join(repo)
}

/// `<packages_dir>/<repo>/.git`
pub fn git_dir(packages_dir: &Path, repo: &str) -> PathBuf {
    work_tree(packages_dir, repo).join(GIT_DIR_NAME)
}

/// `refs/heads/<branch>` → `<branch>`. Refs outside `refs/heads/` are
/// returned unchanged.
pub fn branch_of(upstream_ref: &str) -> &str {
    upstream_ref.strip_prefix(HEADS_PREFIX).unwrap_or(upstream_ref)
}

/// Full remote-tracking ref for an upstream branch ref:
/// `refs/heads/master` → `refs/remotes/origin/master`.
pub fn tracking_ref(remote: &str, upstream_ref: &str) -> String {
    format!("refs/remotes/{remote}/{}", branch_of(upstream_ref))
}

/// Fetch destination for an upstream branch ref: `remotes/origin/master`.
pub fn tracking_dst(remote: &str, upstream_ref: &str) -> String {
    format!("remotes/{remote}/{}", branch_of(upstream_ref))
}
