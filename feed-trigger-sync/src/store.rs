//! Feed store: the last successfully dispatched bytes of every feed.
//!
//! One file per feed URL under a single state directory:
//!
//! ```text
//! <data_dir>/
//!   https%3A%2F%2Fexample.com%2Ffeed.xml.xml   (raw bytes as fetched)
//!   .staging-XXXXXX.tmp                        (only while a feed is in flight)
//! ```
//!
//! Records are replaced with a staged temp file in the same directory plus
//! an atomic rename, so a reader sees either the old or the new bytes,
//! never a mix. A staged file that is not committed is removed on drop.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use feed_trigger_core::FeedSnapshot;

use crate::error::{io_err, SyncError};
use crate::parse::parse_feed;

/// Suffix appended to the escaped URL.
pub const RECORD_EXTENSION: &str = ".xml";

const STAGING_PREFIX: &str = ".staging-";
const STAGING_SUFFIX: &str = ".tmp";

/// Per-URL record storage rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStore {
    dir: PathBuf,
}

impl FeedStore {
    /// The directory must already exist (see `AppDirs::ensure`).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<percent-encoded url>.xml`; pure, no I/O.
    ///
    /// Every byte outside `A-Z a-z 0-9 - _ . ~` is escaped, so the mapping
    /// is injective and the result never contains a path separator.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.dir
            .join(format!("{}{RECORD_EXTENSION}", urlencoding::encode(url)))
    }

    /// Load and parse the record for `url`.
    ///
    /// Returns `Ok(None)` when no record exists yet and
    /// `SyncError::CorruptRecord` when one exists but does not parse.
    pub fn load(&self, url: &str) -> Result<Option<FeedSnapshot>, SyncError> {
        let path = self.path_for(url);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(path, err)),
        };
        parse_feed(BufReader::new(file))
            .map(Some)
            .map_err(|source| SyncError::CorruptRecord { path, source })
    }

    /// Create an empty staging file in the store directory.
    pub fn stage(&self) -> Result<StagedRecord, SyncError> {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| io_err(&self.dir, e))?;
        Ok(StagedRecord { file })
    }

    /// Atomically replace the record for `url` with a staged file.
    ///
    /// The staged bytes are flushed to disk before the rename. On failure the
    /// staged file is removed and the previous record is left untouched.
    pub fn commit_staged(&self, url: &str, staged: StagedRecord) -> Result<PathBuf, SyncError> {
        let path = self.path_for(url);
        let StagedRecord { mut file } = staged;
        if let Err(source) = file.flush().and_then(|()| file.as_file().sync_all()) {
            return Err(SyncError::Commit { path, source });
        }
        match file.persist(&path) {
            Ok(_) => Ok(path),
            // Dropping `err.file` removes the staged file.
            Err(err) => Err(SyncError::Commit {
                path,
                source: err.error,
            }),
        }
    }

    /// Atomically replace the record for `url` with `raw`.
    pub fn commit(&self, url: &str, raw: &[u8]) -> Result<PathBuf, SyncError> {
        let mut staged = self.stage()?;
        staged
            .write_all(raw)
            .map_err(|e| io_err(staged.path(), e))?;
        self.commit_staged(url, staged)
    }

    /// Staging files currently present in the directory.
    pub fn staged_files(&self) -> Result<Vec<PathBuf>, SyncError> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| io_err(&self.dir, e))? {
            let entry = entry.map_err(|e| io_err(&self.dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(STAGING_PREFIX) && name.ends_with(STAGING_SUFFIX) {
                found.push(entry.path());
            }
        }
        found.sort();
        Ok(found)
    }

    /// Remove staging files left behind by a crashed run.
    ///
    /// Returns how many were removed.
    pub fn sweep_staged(&self) -> Result<usize, SyncError> {
        let stale = self.staged_files()?;
        for path in &stale {
            std::fs::remove_file(path).map_err(|e| io_err(path, e))?;
            tracing::warn!(path = %path.display(), "removed stale staging file");
        }
        Ok(stale.len())
    }
}

/// A temp file in the store directory holding bytes for a future commit.
///
/// Deleted on drop unless passed to [`FeedStore::commit_staged`].
#[derive(Debug)]
pub struct StagedRecord {
    file: NamedTempFile,
}

impl StagedRecord {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Write for StagedRecord {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FEED: &str = r#"<rss version="2.0"><channel><title>t</title>
<item><guid>1</guid><title>one</title></item>
</channel></rss>"#;

    fn store() -> (TempDir, FeedStore) {
        let tmp = TempDir::new().unwrap();
        let store = FeedStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn path_for_escapes_the_whole_url() {
        let (_tmp, store) = store();
        let path = store.path_for("https://example.com/feed?a=1&b=2");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "https%3A%2F%2Fexample.com%2Ffeed%3Fa%3D1%26b%3D2.xml");
        assert_eq!(path.parent().unwrap(), store.dir());
    }

    #[test]
    fn path_for_distinct_urls_never_collide() {
        let (_tmp, store) = store();
        let urls = [
            "https://example.com/a b",
            "https://example.com/a+b",
            "https://example.com/a%20b",
            "https://example.com/a/b",
            "https://example.com/a%2Fb",
            "http://example.com/a/b",
        ];
        let mut paths: Vec<_> = urls.iter().map(|u| store.path_for(u)).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), urls.len());
    }

    #[test]
    fn load_missing_record_is_none() {
        let (_tmp, store) = store();
        assert!(store.load("https://example.com/feed").unwrap().is_none());
    }

    #[test]
    fn load_corrupt_record_is_an_error() {
        let (_tmp, store) = store();
        let url = "https://example.com/feed";
        std::fs::write(store.path_for(url), "definitely not a feed").unwrap();
        let err = store.load(url).unwrap_err();
        assert!(matches!(err, SyncError::CorruptRecord { .. }), "got: {err:?}");
    }

    #[test]
    fn commit_then_load_roundtrip() {
        let (_tmp, store) = store();
        let url = "https://example.com/feed";
        let path = store.commit(url, FEED.as_bytes()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), FEED);
        let loaded = store.load(url).unwrap().expect("record");
        assert_eq!(loaded.entries.len(), 1);
        assert!(store.staged_files().unwrap().is_empty());
    }

    #[test]
    fn commit_replaces_existing_record() {
        let (_tmp, store) = store();
        let url = "https://example.com/feed";
        store.commit(url, b"old").unwrap();
        store.commit(url, FEED.as_bytes()).unwrap();
        assert_eq!(std::fs::read_to_string(store.path_for(url)).unwrap(), FEED);
    }

    #[test]
    fn dropped_stage_is_removed() {
        let (_tmp, store) = store();
        let mut staged = store.stage().unwrap();
        staged.write_all(b"partial").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(store.staged_files().unwrap(), vec![path.clone()]);
        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn sweep_removes_orphaned_staging_files() {
        let (tmp, store) = store();
        std::fs::write(tmp.path().join(".staging-abc123.tmp"), "orphan").unwrap();
        std::fs::write(tmp.path().join("keep.xml"), "record").unwrap();
        assert_eq!(store.sweep_staged().unwrap(), 1);
        assert!(store.staged_files().unwrap().is_empty());
        assert!(tmp.path().join("keep.xml").exists());
    }

    #[test]
    #[cfg(unix)]
    fn rename_failure_leaves_original_and_cleans_stage() {
        let (_tmp, store) = store();
        let url = "https://example.com/feed";
        let record = store.path_for(url);
        // A directory at the record path makes the rename fail.
        std::fs::create_dir(&record).unwrap();
        std::fs::write(record.join("inner"), "original").unwrap();

        let mut staged = store.stage().unwrap();
        staged.write_all(FEED.as_bytes()).unwrap();
        let staged_path = staged.path().to_path_buf();

        let err = store.commit_staged(url, staged).unwrap_err();
        assert!(matches!(err, SyncError::Commit { .. }), "got: {err:?}");
        assert!(!staged_path.exists(), "staged file must be cleaned up");
        assert_eq!(
            std::fs::read_to_string(record.join("inner")).unwrap(),
            "original"
        );
    }
}
