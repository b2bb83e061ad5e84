//! Local ref-state probes.
//!
//! A probe answers "which commit does my remote-tracking copy of upstream ref
//! X point at?" The answer for a ref that was never fetched is the empty
//! sentinel, never an error.

use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::sync::RwLock;

use slug_core::{layout, CommitId};

use crate::handle::RepoHandle;

/// Resolves the locally recorded commit for an upstream ref.
pub trait RefProbe: Send + Sync {
    /// `upstream_ref` is the name as it appears in the index
    /// (`refs/heads/master`); implementations map it to the tracking ref.
    fn read_local_ref(&self, repo: &RepoHandle, upstream_ref: &str) -> CommitId;
}

// ---------------------------------------------------------------------------
// Filesystem probe
// ---------------------------------------------------------------------------

/// Reads `<git-dir>/refs/remotes/<remote>/<branch>`, falling back to
/// `<git-dir>/packed-refs`.
#[derive(Debug, Clone)]
pub struct FsRefProbe {
    remote: String,
}

impl FsRefProbe {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }
}

impl RefProbe for FsRefProbe {
    fn read_local_ref(&self, repo: &RepoHandle, upstream_ref: &str) -> CommitId {
        let tracking = layout::tracking_ref(&self.remote, upstream_ref);
        loose_ref(repo, &tracking)
            .or_else(|| packed_ref(repo, &tracking))
            .unwrap_or_default()
    }
}

fn loose_ref(repo: &RepoHandle, tracking: &str) -> Option<CommitId> {
    let content = fs::read_to_string(repo.git_dir().join(tracking)).ok()?;
    let first = content.lines().next().unwrap_or("").trim();
    Some(CommitId::parse(first).unwrap_or_default())
}

fn packed_ref(repo: &RepoHandle, tracking: &str) -> Option<CommitId> {
    let file = fs::File::open(repo.git_dir().join("packed-refs")).ok()?;
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        let fields: Vec<&str> = line.split_whitespace().collect();
        if let [commit, name] = fields[..] {
            if name == tracking {
                return CommitId::parse(commit);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// In-memory probe
// ---------------------------------------------------------------------------

/// A ref store held in memory, keyed by repository name and upstream ref.
#[derive(Debug, Default)]
pub struct MemoryRefProbe {
    refs: RwLock<HashMap<(String, String), CommitId>>,
}

impl MemoryRefProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `repo`'s tracking copy of `upstream_ref` is at `commit`.
    pub fn set(&self, repo: &str, upstream_ref: &str, commit: CommitId) {
        if let Ok(mut refs) = self.refs.write() {
            refs.insert((repo.to_string(), upstream_ref.to_string()), commit);
        }
    }
}

impl RefProbe for MemoryRefProbe {
    fn read_local_ref(&self, repo: &RepoHandle, upstream_ref: &str) -> CommitId {
        self.refs
            .read()
            .ok()
            .and_then(|refs| {
                refs.get(&(repo.name().to_string(), upstream_ref.to_string()))
                    .cloned()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use slug_core::RepoName;
    use tempfile::TempDir;

    const A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn repo(tmp: &TempDir) -> RepoHandle {
        let handle = RepoHandle::in_packages(tmp.path(), &RepoName::from("rpm"));
        fs::create_dir_all(handle.git_dir()).expect("mkdir .git");
        handle
    }

    fn write_loose(handle: &RepoHandle, branch: &str, commit: &str) {
        let path = handle.git_dir().join("refs/remotes/origin").join(branch);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("{commit}\n")).unwrap();
    }

    #[test]
    fn loose_ref_wins() {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        write_loose(&handle, "master", A);
        fs::write(
            handle.git_dir().join("packed-refs"),
            format!("{B} refs/remotes/origin/master\n"),
        )
        .unwrap();

        let probe = FsRefProbe::new("origin");
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/master").as_str(), A);
    }

    #[rstest]
    #[case::plain(format!("{A}\n"), A)]
    #[case::uppercase(format!("{}\n", A.to_uppercase()), A)]
    #[case::symbolic("ref: refs/remotes/origin/master\n".to_string(), layout::EMPTY_COMMIT)]
    #[case::garbage("not a commit\n".to_string(), layout::EMPTY_COMMIT)]
    #[case::empty_file(String::new(), layout::EMPTY_COMMIT)]
    fn loose_ref_contents(#[case] contents: String, #[case] expected: &str) {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        let path = handle.git_dir().join("refs/remotes/origin/master");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();

        let probe = FsRefProbe::new("origin");
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/master").as_str(), expected);
    }

    #[test]
    fn packed_refs_fallback() {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        fs::write(
            handle.git_dir().join("packed-refs"),
            format!(
                "# pack-refs with: peeled fully-peeled sorted\n\
                 {A} refs/remotes/origin/DEVEL\n\
                 {B} refs/remotes/origin/master\n\
                 ^{A}\n"
            ),
        )
        .unwrap();

        let probe = FsRefProbe::new("origin");
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/master").as_str(), B);
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/DEVEL").as_str(), A);
    }

    #[test]
    fn packed_refs_requires_exact_name() {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        fs::write(
            handle.git_dir().join("packed-refs"),
            format!("{A} refs/remotes/origin/master-old\n"),
        )
        .unwrap();
        let probe = FsRefProbe::new("origin");
        assert!(probe.read_local_ref(&handle, "refs/heads/master").is_empty());
    }

    #[test]
    fn missing_everything_is_empty_sentinel() {
        let tmp = TempDir::new().unwrap();
        let handle = RepoHandle::in_packages(tmp.path(), &RepoName::from("never-cloned"));
        let probe = FsRefProbe::new("origin");
        assert!(probe.read_local_ref(&handle, "refs/heads/master").is_empty());
    }

    #[test]
    fn nested_branch_names_map_to_nested_files() {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        write_loose(&handle, "dev/topic", A);
        let probe = FsRefProbe::new("origin");
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/dev/topic").as_str(), A);
    }

    #[test]
    fn other_remote_name_is_respected() {
        let tmp = TempDir::new().unwrap();
        let handle = repo(&tmp);
        write_loose(&handle, "master", A);
        let probe = FsRefProbe::new("upstream");
        assert!(probe.read_local_ref(&handle, "refs/heads/master").is_empty());
    }

    #[test]
    fn memory_probe_defaults_to_empty() {
        let probe = MemoryRefProbe::new();
        let handle = RepoHandle::in_packages(std::path::Path::new("/x"), &RepoName::from("rpm"));
        assert!(probe.read_local_ref(&handle, "refs/heads/master").is_empty());
        probe.set("rpm", "refs/heads/master", CommitId::parse(A).unwrap());
        assert_eq!(probe.read_local_ref(&handle, "refs/heads/master").as_str(), A);
    }
}
