//! The authoritative reference index.
//!
//! # Wire format
//!
//! ```text
//! <commit-id> <ref-name> <repository-name>
//! 8d1f6c0e1a... refs/heads/master rpm
//! 2b0e9a1d7c... refs/heads/DEVEL  rpm
//! ```
//!
//! One line per (repository, ref). Parsing keeps a line only when its ref
//! matches a branch glob (as `refs/heads/<glob>`) and its repository matches a
//! repository glob. Lookups of unknown repositories yield an empty ref map, so
//! "absent upstream" and "no refs" are the same thing.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use crate::error::IndexError;
use crate::layout::HEADS_PREFIX;
use crate::patterns::PatternSet;
use crate::types::{CommitId, RepoName};

/// Upstream ref name → commit id for one repository.
pub type RefMap = BTreeMap<String, CommitId>;

static NO_REFS: RefMap = BTreeMap::new();

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Branch and repository globs applied while parsing.
#[derive(Debug, Clone)]
pub struct IndexFilter {
    branches: PatternSet,
    repos: PatternSet,
}

impl IndexFilter {
    pub fn new<B: AsRef<str>, R: AsRef<str>>(
        branches: &[B],
        repos: &[R],
    ) -> Result<Self, IndexError> {
        Ok(Self {
            branches: PatternSet::with_prefix(HEADS_PREFIX, branches)?,
            repos: PatternSet::new(repos)?,
        })
    }

    /// Every branch of every repository. Used by the pruner.
    pub fn everything() -> Self {
        Self {
            branches: PatternSet::with_prefix(HEADS_PREFIX, &["*"])
                .unwrap_or_else(|_| unreachable!("`refs/heads/*` is a valid glob")),
            repos: PatternSet::everything(),
        }
    }

    pub fn accepts(&self, ref_name: &str, repo: &str) -> bool {
        self.branches.is_match(ref_name) && self.repos.is_match(repo)
    }

    pub fn repos(&self) -> &PatternSet {
        &self.repos
    }
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Repository → upstream ref → commit id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    heads: BTreeMap<RepoName, RefMap>,
}

impl ReferenceIndex {
    /// Parse a serialized index, keeping only lines accepted by `filter`.
    ///
    /// Fails with [`IndexError::Malformed`] on any line that is not exactly
    /// three fields (the whole construction is rejected), and with
    /// [`IndexError::NoMatchedRepos`] when nothing survives filtering.
    pub fn parse<R: BufRead>(reader: R, filter: &IndexFilter) -> Result<Self, IndexError> {
        let mut heads: BTreeMap<RepoName, RefMap> = BTreeMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [commit, ref_name, repo] = fields[..] else {
                return Err(IndexError::Malformed { line_no, line });
            };
            let commit = CommitId::parse(commit).ok_or_else(|| IndexError::InvalidCommit {
                line_no,
                commit: commit.to_string(),
            })?;
            if filter.accepts(ref_name, repo) {
                heads
                    .entry(RepoName::from(repo))
                    .or_default()
                    .insert(ref_name.to_string(), commit);
            }
        }
        if heads.is_empty() {
            return Err(IndexError::NoMatchedRepos);
        }
        Ok(Self { heads })
    }

    /// [`ReferenceIndex::parse`] over an in-memory string.
    pub fn parse_str(text: &str, filter: &IndexFilter) -> Result<Self, IndexError> {
        Self::parse(text.as_bytes(), filter)
    }

    /// Repository names in lexicographic order.
    pub fn repos(&self) -> impl Iterator<Item = &RepoName> {
        self.heads.keys()
    }

    /// Refs recorded for `repo`; empty when the repository is not indexed.
    pub fn refs(&self, repo: &str) -> &RefMap {
        self.heads.get(repo).unwrap_or(&NO_REFS)
    }

    pub fn contains(&self, repo: &str) -> bool {
        self.heads.contains_key(repo)
    }

    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Apply `old-commit new-commit ref-name` update lines for `repo`.
    ///
    /// Only `refs/heads/` refs are recorded and the last line applied wins.
    /// A deletion arrives as the empty sentinel and is kept so that `dump`
    /// can omit it.
    pub fn put<I, S>(&mut self, repo: &str, lines: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (idx, line) in lines.into_iter().enumerate() {
            let line = line.as_ref();
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [_old, new, ref_name] = fields[..] else {
                return Err(IndexError::Malformed {
                    line_no,
                    line: line.to_string(),
                });
            };
            if !ref_name.starts_with(HEADS_PREFIX) {
                continue;
            }
            let commit = CommitId::parse(new).ok_or_else(|| IndexError::InvalidCommit {
                line_no,
                commit: new.to_string(),
            })?;
            self.heads
                .entry(RepoName::from(repo))
                .or_default()
                .insert(ref_name.to_string(), commit);
        }
        Ok(())
    }

    /// Serialize in lexicographic order, skipping deleted refs.
    pub fn dump<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        for (repo, refs) in &self.heads {
            for (ref_name, commit) in refs {
                if commit.is_empty() {
                    continue;
                }
                writeln!(out, "{commit} {ref_name} {repo}")?;
            }
        }
        Ok(())
    }

    /// [`ReferenceIndex::dump`] into a `String`.
    pub fn dump_to_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.dump(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::EMPTY_COMMIT;

    const SAMPLE: &str = "\
aaa111 refs/heads/master pkg-a
bbb222 refs/heads/DEVEL pkg-a
ccc333 refs/heads/master pkg-b
ddd444 refs/tags/auto/th/pkg-b-1.0-1 pkg-b
eee555 refs/heads/master python-foo
";

    fn all() -> IndexFilter {
        IndexFilter::everything()
    }

    #[test]
    fn parse_groups_refs_by_repository() {
        let index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        let repos: Vec<_> = index.repos().map(|r| r.as_str()).collect();
        assert_eq!(repos, vec!["pkg-a", "pkg-b", "python-foo"]);
        assert_eq!(index.refs("pkg-a").len(), 2);
        assert_eq!(
            index.refs("pkg-a").get("refs/heads/master").map(|c| c.as_str()),
            Some("aaa111")
        );
    }

    #[test]
    fn tags_are_never_retained() {
        let index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        assert!(index
            .refs("pkg-b")
            .keys()
            .all(|r| r.starts_with(HEADS_PREFIX)));
    }

    #[test]
    fn filters_apply_to_both_branch_and_repository() {
        let filter = IndexFilter::new(&["master"], &["pkg-*"]).expect("filter");
        let index = ReferenceIndex::parse_str(SAMPLE, &filter).expect("parse");
        assert_eq!(index.len(), 2);
        assert!(!index.contains("python-foo"));
        assert!(!index.refs("pkg-a").contains_key("refs/heads/DEVEL"));
    }

    #[test]
    fn unknown_repository_has_no_refs() {
        let index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        assert!(index.refs("does-not-exist").is_empty());
    }

    #[test]
    fn no_match_is_distinct_from_parse_error() {
        let filter = IndexFilter::new(&["master"], &["nothing-*"]).expect("filter");
        let err = ReferenceIndex::parse_str(SAMPLE, &filter).unwrap_err();
        assert!(err.is_no_match(), "got: {err}");
    }

    #[test]
    fn malformed_line_rejects_whole_index() {
        let text = "aaa111 refs/heads/master pkg-a\nbroken line\n";
        let err = ReferenceIndex::parse_str(text, &all()).unwrap_err();
        match err {
            IndexError::Malformed { line_no, line } => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "broken line");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn malformed_line_is_rejected_even_when_filtered_out() {
        let filter = IndexFilter::new(&["master"], &["pkg-a"]).expect("filter");
        let text = "aaa111 refs/heads/master pkg-a\nccc333 refs/heads/master pkg-b extra\n";
        let err = ReferenceIndex::parse_str(text, &filter).unwrap_err();
        assert!(matches!(err, IndexError::Malformed { line_no: 2, .. }));
    }

    #[test]
    fn non_hex_commit_is_rejected() {
        let err = ReferenceIndex::parse_str("zzz refs/heads/master pkg-a\n", &all()).unwrap_err();
        assert!(matches!(err, IndexError::InvalidCommit { line_no: 1, .. }));
    }

    #[test]
    fn blank_lines_are_ignored() {
        let index =
            ReferenceIndex::parse_str("\naaa111 refs/heads/master pkg-a\n\n", &all()).expect("parse");
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn put_records_heads_only_and_last_write_wins() {
        let mut index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        index
            .put(
                "pkg-a",
                [
                    "aaa111 fff666 refs/heads/master",
                    "000000 abc123 refs/tags/v1",
                    "fff666 999999 refs/heads/master",
                ],
            )
            .expect("put");
        let refs = index.refs("pkg-a");
        assert_eq!(refs.get("refs/heads/master").map(|c| c.as_str()), Some("999999"));
        assert!(!refs.contains_key("refs/tags/v1"));
    }

    #[test]
    fn put_creates_new_repository() {
        let mut index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        index
            .put("pkg-new", [format!("{EMPTY_COMMIT} abcdef refs/heads/master")])
            .expect("put");
        assert!(index.contains("pkg-new"));
    }

    #[test]
    fn put_rejects_malformed_update() {
        let mut index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        let err = index.put("pkg-a", ["only two"]).unwrap_err();
        assert!(matches!(err, IndexError::Malformed { .. }));
    }

    #[test]
    fn dump_skips_deleted_refs() {
        let mut index = ReferenceIndex::parse_str(SAMPLE, &all()).expect("parse");
        index
            .put("pkg-a", [format!("bbb222 {EMPTY_COMMIT} refs/heads/DEVEL")])
            .expect("put");
        let dumped = index.dump_to_string();
        assert!(!dumped.contains("refs/heads/DEVEL"));
        assert!(dumped.contains("aaa111 refs/heads/master pkg-a"));
    }

    #[test]
    fn dump_is_sorted() {
        let shuffled = "\
eee555 refs/heads/master python-foo
ccc333 refs/heads/master pkg-b
bbb222 refs/heads/DEVEL pkg-a
aaa111 refs/heads/master pkg-a
";
        let index = ReferenceIndex::parse_str(shuffled, &all()).expect("parse");
        assert_eq!(
            index.dump_to_string(),
            "\
bbb222 refs/heads/DEVEL pkg-a
aaa111 refs/heads/master pkg-a
ccc333 refs/heads/master pkg-b
eee555 refs/heads/master python-foo
"
        );
    }
}
