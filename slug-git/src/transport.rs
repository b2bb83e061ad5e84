//! Reference index transport.
//!
//! The index normally comes from the index repository as
//! `git archive --format=tgz --remote=<url> HEAD`, whose first member must be
//! the single file [`layout::INDEX_FILE`]. A local file (or stdin) holding the
//! same serialized text can stand in for it.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::Stdio;

use flate2::read::GzDecoder;
use slug_core::{layout, IndexError, IndexFilter, ReferenceIndex};
use tar::EntryType;

use crate::error::ArchiveError;
use crate::git_cli::GitCli;

/// Somewhere the serialized reference index can be read from.
pub trait IndexSource: Send + Sync {
    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;

    /// The complete serialized index text.
    fn read(&self) -> Result<String, IndexError>;
}

/// Read and parse the index from `source` through `filter`.
pub fn load_index(
    source: &dyn IndexSource,
    filter: &IndexFilter,
) -> Result<ReferenceIndex, IndexError> {
    let text = source.read()?;
    let index = ReferenceIndex::parse_str(&text, filter)?;
    tracing::info!(
        source = %source.describe(),
        repositories = index.len(),
        "loaded reference index"
    );
    Ok(index)
}

// ---------------------------------------------------------------------------
// Local file
// ---------------------------------------------------------------------------

/// A serialized index on disk; `-` reads stdin.
#[derive(Debug, Clone)]
pub struct FileIndex {
    path: PathBuf,
}

impl FileIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IndexSource for FileIndex {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<String, IndexError> {
        if self.path.as_os_str() == "-" {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            return Ok(text);
        }
        std::fs::read_to_string(&self.path).map_err(|err| IndexError::Unavailable {
            file: self.path.display().to_string(),
            repository: "local filesystem".to_string(),
            reason: err.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// In-memory text
// ---------------------------------------------------------------------------

/// Index text already in memory.
#[derive(Debug, Clone, Default)]
pub struct InlineIndex(pub String);

impl IndexSource for InlineIndex {
    fn describe(&self) -> String {
        "inline".to_string()
    }

    fn read(&self) -> Result<String, IndexError> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// Remote archive
// ---------------------------------------------------------------------------

/// `git archive --remote` export of the index repository.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    git: GitCli,
    url: String,
}

impl ArchiveIndex {
    pub fn new(git: GitCli, url: impl Into<String>) -> Self {
        Self {
            git,
            url: url.into(),
        }
    }

    fn unavailable(&self, reason: impl Into<String>) -> IndexError {
        IndexError::Unavailable {
            file: layout::INDEX_FILE.to_string(),
            repository: self.url.clone(),
            reason: reason.into(),
        }
    }
}

impl IndexSource for ArchiveIndex {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn read(&self) -> Result<String, IndexError> {
        let mut child = self
            .git
            .command()
            .arg("archive")
            .arg("--format=tgz")
            .arg(format!("--remote={}", self.url))
            .arg("HEAD")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| self.unavailable(format!("cannot run git archive: {err}")))?;

        let Some(mut stdout) = child.stdout.take() else {
            return Err(self.unavailable("git archive produced no output stream"));
        };
        let member = read_archive_member(&mut stdout, layout::INDEX_FILE);
        // Drain so the exporter never blocks on a full pipe before exiting.
        let _ = io::copy(&mut stdout, &mut io::sink());
        drop(stdout);

        let status = child
            .wait()
            .map_err(|err| self.unavailable(format!("waiting for git archive: {err}")))?;
        let text = member.map_err(|err| self.unavailable(err.to_string()))?;
        if !status.success() {
            return Err(self.unavailable(format!("git archive exited with {status}")));
        }
        Ok(text)
    }
}

/// Extract the first real member of a gzip-compressed tar stream, requiring
/// it to be named `member`. Pax global headers (emitted by `git archive`) are
/// skipped.
pub fn read_archive_member<R: Read>(reader: R, member: &str) -> Result<String, ArchiveError> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive.entries().map_err(ArchiveError::Unreadable)?;
    for entry in entries {
        let mut entry = entry.map_err(ArchiveError::Unreadable)?;
        if entry.header().entry_type() == EntryType::XGlobalHeader {
            continue;
        }
        let name = entry
            .path()
            .map_err(ArchiveError::Unreadable)?
            .to_string_lossy()
            .into_owned();
        if name != member {
            return Err(ArchiveError::UnexpectedMember {
                expected: member.to_string(),
                found: name,
            });
        }
        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|source| ArchiveError::Member {
                member: member.to_string(),
                source,
            })?;
        return Ok(text);
    }
    Err(ArchiveError::Missing(member.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use tempfile::TempDir;

    const INDEX: &str = "aaa111 refs/heads/master pkg-a\nbbb222 refs/heads/master pkg-b\n";

    fn tgz(members: &[(&str, &str)], global_header: bool) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        if global_header {
            let data = format!("52 comment={}\n", "1".repeat(40));
            let mut header = tar::Header::new_ustar();
            header.set_entry_type(EntryType::XGlobalHeader);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, "pax_global_header", data.as_bytes())
                .expect("append global header");
        }
        for (name, content) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, name, content.as_bytes())
                .expect("append member");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }

    #[test]
    fn extracts_index_member() {
        let bytes = tgz(&[("heads", INDEX)], false);
        let text = read_archive_member(bytes.as_slice(), "heads").expect("extract");
        assert_eq!(text, INDEX);
    }

    #[test]
    fn skips_pax_global_header() {
        let bytes = tgz(&[("heads", INDEX)], true);
        let text = read_archive_member(bytes.as_slice(), "heads").expect("extract");
        assert_eq!(text, INDEX);
    }

    #[test]
    fn wrong_first_member_is_rejected() {
        let bytes = tgz(&[("README", "hello"), ("heads", INDEX)], false);
        let err = read_archive_member(bytes.as_slice(), "heads").unwrap_err();
        match err {
            ArchiveError::UnexpectedMember { expected, found } => {
                assert_eq!(expected, "heads");
                assert_eq!(found, "README");
            }
            other => panic!("expected wrong member, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        let err = read_archive_member(&b"definitely not gzip"[..], "heads").unwrap_err();
        assert!(matches!(err, ArchiveError::Unreadable(_)), "got: {err:?}");
        assert!(err.to_string().starts_with("unreadable archive"));
    }

    #[test]
    fn empty_archive_is_rejected() {
        let bytes = tgz(&[], true);
        let err = read_archive_member(bytes.as_slice(), "heads").unwrap_err();
        assert!(matches!(&err, ArchiveError::Missing(m) if m == "heads"), "got: {err:?}");
    }

    #[test]
    fn file_source_reads_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("heads");
        std::fs::write(&path, INDEX).unwrap();
        let index = load_index(&FileIndex::new(&path), &IndexFilter::everything()).expect("load");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let err = FileIndex::new(tmp.path().join("missing")).read().unwrap_err();
        assert!(matches!(err, IndexError::Unavailable { .. }), "got: {err}");
    }

    #[test]
    fn archive_from_unreachable_repository_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let source = ArchiveIndex::new(
            GitCli::new("origin").with_program(tmp.path().join("no-such-git")),
            "git://example.invalid/Refs",
        );
        let err = source.read().unwrap_err();
        match err {
            IndexError::Unavailable { file, repository, .. } => {
                assert_eq!(file, "heads");
                assert_eq!(repository, "git://example.invalid/Refs");
            }
            other => panic!("expected unavailable, got {other:?}"),
        }
    }
}
