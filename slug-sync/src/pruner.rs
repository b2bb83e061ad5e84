//! Removal of local clones that no longer exist upstream.
//!
//! Must only be given an unfiltered index: a filtered one would make every
//! repository outside the filter look deleted.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use slug_core::{layout, PatternSet, ReferenceIndex};

use crate::error::{io_err, SyncError};
use crate::outcome::Reporter;

/// Directories under `packages_dir` matching `patterns` that hold a clone
/// (`.git` directory) but have no refs in `index`. Sorted by path.
///
/// Hidden directories are only candidates when some pattern itself starts
/// with `.`.
pub fn orphans(
    packages_dir: &Path,
    patterns: &PatternSet,
    index: &ReferenceIndex,
) -> Result<Vec<PathBuf>, SyncError> {
    let entries = match std::fs::read_dir(packages_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(io_err(packages_dir, err)),
    };

    let hidden_allowed = patterns.patterns().iter().any(|p| p.starts_with('.'));
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(packages_dir, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') && !hidden_allowed {
            continue;
        }
        if !patterns.is_match(&name) {
            continue;
        }
        let path = entry.path();
        if index.refs(&name).is_empty() && path.join(layout::GIT_DIR_NAME).is_dir() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Delete every orphan. Returns the removed directories.
pub fn prune(
    packages_dir: &Path,
    patterns: &PatternSet,
    index: &ReferenceIndex,
    reporter: &dyn Reporter,
) -> Result<Vec<PathBuf>, SyncError> {
    let doomed = orphans(packages_dir, patterns, index)?;
    for dir in &doomed {
        tracing::info!(path = %dir.display(), "removing repository absent upstream");
        reporter.removed(dir);
        std::fs::remove_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    Ok(doomed)
}
