//! Fetch planning: what must be transferred to make one clone current.

use slug_core::{layout, refs_index::RefMap};
use slug_git::{RefProbe, RepoHandle};

/// Refspecs for one `git fetch`, always ending with the notes refspec.
///
/// Only constructed by [`plan`], so a spec is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    refspecs: Vec<String>,
}

impl FetchSpec {
    pub fn refspecs(&self) -> &[String] {
        &self.refspecs
    }

    /// Number of branch refspecs, excluding the trailing notes entry.
    pub fn branch_count(&self) -> usize {
        self.refspecs.len().saturating_sub(1)
    }
}

/// Which indexed repositories are eligible for planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlanPolicy {
    /// Initialize repositories missing locally instead of skipping them.
    pub new_repos: bool,
    /// Skip repositories that already have a local clone.
    pub omit_existing: bool,
}

/// What to do with one indexed repository before planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Plan,
    InitThenPlan,
    SkipMissing,
    SkipExisting,
}

impl PlanPolicy {
    pub fn eligibility(&self, repo: &RepoHandle) -> Eligibility {
        match (repo.exists(), self.new_repos, self.omit_existing) {
            (false, true, _) => Eligibility::InitThenPlan,
            (false, false, _) => Eligibility::SkipMissing,
            (true, _, true) => Eligibility::SkipExisting,
            (true, _, false) => Eligibility::Plan,
        }
    }
}

/// Compare `indexed` refs with the local tracking refs of `repo`.
///
/// Returns `None` when every ref already matches, so the repository needs no
/// network traffic at all. Comparison is plain commit-id equality; a diverged
/// tracking ref is fetched like a missing one.
pub fn plan<P: RefProbe + ?Sized>(
    repo: &RepoHandle,
    indexed: &RefMap,
    probe: &P,
    remote: &str,
) -> Option<FetchSpec> {
    let mut refspecs = Vec::new();
    for (upstream_ref, wanted) in indexed {
        let local = probe.read_local_ref(repo, upstream_ref);
        if &local != wanted {
            refspecs.push(format!(
                "+{upstream_ref}:{}",
                layout::tracking_dst(remote, upstream_ref)
            ));
        }
    }
    if refspecs.is_empty() {
        return None;
    }
    refspecs.push(layout::NOTES_REFSPEC.to_string());
    Some(FetchSpec { refspecs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slug_core::{CommitId, IndexFilter, ReferenceIndex, RepoName};
    use slug_git::MemoryRefProbe;
    use std::path::Path;
    use tempfile::TempDir;

    fn commit(s: &str) -> CommitId {
        CommitId::parse(s).expect("hex")
    }

    fn handle(name: &str) -> RepoHandle {
        RepoHandle::in_packages(Path::new("/pkgs"), &RepoName::from(name))
    }

    #[test]
    fn never_fetched_repository_gets_branch_and_notes() {
        let index = ReferenceIndex::parse_str(
            "aaa111 refs/heads/master pkg-a\n",
            &IndexFilter::everything(),
        )
        .expect("parse");
        let probe = MemoryRefProbe::new();

        let spec = plan(&handle("pkg-a"), index.refs("pkg-a"), &probe, "origin").expect("spec");
        assert_eq!(
            spec.refspecs(),
            &[
                "+refs/heads/master:remotes/origin/master".to_string(),
                "refs/notes/*:refs/notes/*".to_string(),
            ]
        );
        assert_eq!(spec.branch_count(), 1);
    }

    #[test]
    fn current_repository_needs_no_fetch() {
        let index = ReferenceIndex::parse_str(
            "ccc333 refs/heads/master pkg-b\nddd444 refs/heads/DEVEL pkg-b\n",
            &IndexFilter::everything(),
        )
        .expect("parse");
        let probe = MemoryRefProbe::new();
        probe.set("pkg-b", "refs/heads/master", commit("ccc333"));
        probe.set("pkg-b", "refs/heads/DEVEL", commit("ddd444"));

        assert!(plan(&handle("pkg-b"), index.refs("pkg-b"), &probe, "origin").is_none());
    }

    #[test]
    fn only_stale_refs_are_requested() {
        let index = ReferenceIndex::parse_str(
            "ccc333 refs/heads/master pkg-b\nddd444 refs/heads/DEVEL pkg-b\n",
            &IndexFilter::everything(),
        )
        .expect("parse");
        let probe = MemoryRefProbe::new();
        probe.set("pkg-b", "refs/heads/master", commit("ccc333"));
        probe.set("pkg-b", "refs/heads/DEVEL", commit("0dd000"));

        let spec = plan(&handle("pkg-b"), index.refs("pkg-b"), &probe, "origin").expect("spec");
        assert_eq!(
            spec.refspecs(),
            &[
                "+refs/heads/DEVEL:remotes/origin/DEVEL".to_string(),
                "refs/notes/*:refs/notes/*".to_string(),
            ]
        );
    }

    #[test]
    fn each_plan_gets_a_fresh_refspec_list() {
        let index = ReferenceIndex::parse_str(
            "aaa111 refs/heads/master pkg-a\nbbb222 refs/heads/master pkg-b\n",
            &IndexFilter::everything(),
        )
        .expect("parse");
        let probe = MemoryRefProbe::new();
        let a = plan(&handle("pkg-a"), index.refs("pkg-a"), &probe, "origin").expect("a");
        let b = plan(&handle("pkg-b"), index.refs("pkg-b"), &probe, "origin").expect("b");
        assert_eq!(a.refspecs().len(), 2);
        assert_eq!(b.refspecs().len(), 2);
    }

    #[test]
    fn empty_ref_map_needs_no_fetch() {
        let probe = MemoryRefProbe::new();
        assert!(plan(&handle("gone"), &RefMap::new(), &probe, "origin").is_none());
    }

    #[test]
    fn eligibility_follows_policy_switches() {
        let tmp = TempDir::new().unwrap();
        let present = RepoHandle::in_packages(tmp.path(), &RepoName::from("present"));
        std::fs::create_dir_all(present.git_dir()).unwrap();
        let missing = RepoHandle::in_packages(tmp.path(), &RepoName::from("missing"));

        let update = PlanPolicy::default();
        assert_eq!(update.eligibility(&present), Eligibility::Plan);
        assert_eq!(update.eligibility(&missing), Eligibility::SkipMissing);

        let new_repos = PlanPolicy { new_repos: true, omit_existing: false };
        assert_eq!(new_repos.eligibility(&missing), Eligibility::InitThenPlan);
        assert_eq!(new_repos.eligibility(&present), Eligibility::Plan);

        let clone = PlanPolicy { new_repos: true, omit_existing: true };
        assert_eq!(clone.eligibility(&present), Eligibility::SkipExisting);
        assert_eq!(clone.eligibility(&missing), Eligibility::InitThenPlan);
    }
}
