//! A handle on one local clone.

use std::path::{Path, PathBuf};

use slug_core::{layout, RepoName};

/// Identifies one local clone by its paths. Does not own the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoHandle {
    name: RepoName,
    work_tree: PathBuf,
    git_dir: PathBuf,
}

impl RepoHandle {
    /// `<packages_dir>/<name>` with its `.git` directory.
    pub fn in_packages(packages_dir: &Path, name: &RepoName) -> Self {
        Self {
            name: name.clone(),
            work_tree: layout::work_tree(packages_dir, name.as_str()),
            git_dir: layout::git_dir(packages_dir, name.as_str()),
        }
    }

    pub fn name(&self) -> &RepoName {
        &self.name
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// `true` when the metadata directory exists, i.e. the clone was
    /// initialized at some point.
    pub fn exists(&self) -> bool {
        self.git_dir.is_dir()
    }

    /// Directory name shown to the user in per-repository report lines.
    pub fn display_dir(&self) -> String {
        self.work_tree.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_follow_packages_layout() {
        let handle = RepoHandle::in_packages(Path::new("/pkgs"), &RepoName::from("rpm"));
        assert_eq!(handle.work_tree(), Path::new("/pkgs/rpm"));
        assert_eq!(handle.git_dir(), Path::new("/pkgs/rpm/.git"));
        assert_eq!(handle.name().as_str(), "rpm");
    }

    #[test]
    fn exists_requires_git_dir() {
        let tmp = TempDir::new().unwrap();
        let handle = RepoHandle::in_packages(tmp.path(), &RepoName::from("rpm"));
        std::fs::create_dir_all(handle.work_tree()).unwrap();
        assert!(!handle.exists());
        std::fs::create_dir_all(handle.git_dir()).unwrap();
        assert!(handle.exists());
    }
}
