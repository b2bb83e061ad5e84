//! Shell-style glob sets.
//!
//! Matching is whole-string and `*` crosses `/`, so `refs/heads/*` accepts
//! `refs/heads/dev/topic` as well as `refs/heads/master`.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::IndexError;

/// A compiled union of glob patterns: a candidate matches if any pattern does.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compile `patterns` as-is.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, IndexError> {
        Self::with_prefix("", patterns)
    }

    /// Compile each pattern as `<prefix><pattern>`.
    pub fn with_prefix<S: AsRef<str>>(prefix: &str, patterns: &[S]) -> Result<Self, IndexError> {
        let mut builder = GlobSetBuilder::new();
        let mut expanded = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let full = format!("{prefix}{}", pattern.as_ref());
            let glob = Glob::new(&full).map_err(|source| IndexError::Pattern {
                pattern: full.clone(),
                source,
            })?;
            builder.add(glob);
            expanded.push(full);
        }
        let set = builder.build().map_err(|source| IndexError::Pattern {
            pattern: expanded.join(" "),
            source,
        })?;
        Ok(Self {
            patterns: expanded,
            set,
        })
    }

    /// A lone `*`: accepts every candidate.
    pub fn everything() -> Self {
        // A lone `*` always compiles.
        Self::new(&["*"]).unwrap_or_else(|_| unreachable!("`*` is a valid glob"))
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.set.is_match(candidate)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
