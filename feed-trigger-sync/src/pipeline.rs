//! Sync pipeline shared by the CLI and the integration tests.
//!
//! ## Per-feed protocol
//!
//! 1. Fetch: open the HTTP body. Nothing is staged yet.
//! 2. Stage: parse the body while teeing every byte into a staging file.
//! 3. Diff: load the stored record and subtract its entries.
//! 4. Nothing new → drop the staging file, done.
//! 5. Dispatch: stream the delta into the configured command.
//! 6. Commit: rename the staging file over the record.
//!
//! Any error drops the staging file and leaves the stored record untouched.
//! Feeds are processed strictly in order; one failing feed does not stop
//! the run.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use feed_trigger_core::Config;

use crate::diff;
use crate::dispatch::dispatch;
use crate::error::{io_err, SyncError};
use crate::fetch::FeedSource;
use crate::parse::parse_feed;
use crate::store::FeedStore;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Successful outcome of one feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    /// No entries beyond the stored record; nothing dispatched or written.
    Unchanged,
    /// `entries` new entries were dispatched and the record at `record` replaced.
    Dispatched { entries: usize, record: PathBuf },
}

/// Result for one configured URL.
#[derive(Debug)]
pub struct FeedOutcome {
    pub url: String,
    pub result: Result<FeedStatus, SyncError>,
}

/// Results for a whole run, in configured order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FeedOutcome>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn dispatched(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(FeedStatus::Dispatched { .. })))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, Ok(FeedStatus::Unchanged)))
            .count()
    }

    /// `0` when every feed succeeded, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.failed() == 0 {
            0
        } else {
            1
        }
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Process every feed in `config.feeds`, in order.
pub fn run(source: &dyn FeedSource, store: &FeedStore, config: &Config) -> RunSummary {
    match store.sweep_staged() {
        Ok(0) => {}
        Ok(n) => tracing::info!(removed = n, "cleaned up staging files from an earlier run"),
        Err(err) => tracing::warn!(error = %err, "could not sweep staging files"),
    }

    let mut summary = RunSummary {
        outcomes: Vec::with_capacity(config.feeds.len()),
    };
    for url in &config.feeds {
        let result = sync_feed(source, store, url, &config.run);
        match &result {
            Ok(FeedStatus::Unchanged) => tracing::info!(url = %url, "no new entries"),
            Ok(FeedStatus::Dispatched { entries, .. }) => {
                tracing::info!(url = %url, entries, "dispatched new entries")
            }
            Err(err) => tracing::error!(url = %url, stage = %err.stage(), error = %err, "feed failed"),
        }
        summary.outcomes.push(FeedOutcome {
            url: url.clone(),
            result,
        });
    }

    tracing::info!(
        feeds = summary.outcomes.len(),
        dispatched = summary.dispatched(),
        unchanged = summary.unchanged(),
        failed = summary.failed(),
        "run finished"
    );
    summary
}

// ---------------------------------------------------------------------------
// sync_feed
// ---------------------------------------------------------------------------

/// Fetch, diff, dispatch and commit a single feed.
pub fn sync_feed(
    source: &dyn FeedSource,
    store: &FeedStore,
    url: &str,
    command: &[String],
) -> Result<FeedStatus, SyncError> {
    let body = source.fetch(url)?;

    let mut staged = store.stage()?;
    let staged_path = staged.path().to_path_buf();
    let fresh = {
        let mut tee = Tee::new(body, &mut staged);
        let parsed = parse_feed(&mut tee);
        if let Some(err) = tee.failed.take() {
            return Err(io_err(&staged_path, err));
        }
        let fresh = parsed.map_err(|source| SyncError::Parse {
            url: url.to_string(),
            source,
        })?;
        // The record must hold every fetched byte, including any the parser left unread.
        io::copy(&mut tee, &mut io::sink()).map_err(|e| match tee.failed.take() {
            Some(write_err) => io_err(&staged_path, write_err),
            None => io_err(&staged_path, e),
        })?;
        fresh
    };

    let previous = store.load(url)?;
    let delta = diff::delta(&fresh, previous.as_ref());
    if delta.is_empty() {
        return Ok(FeedStatus::Unchanged);
    }

    tracing::debug!(url, entries = delta.entries.len(), "new entries found");
    dispatch(&delta, command)?;

    let record = store.commit_staged(url, staged)?;
    tracing::debug!(url, record = %record.display(), "record committed");
    Ok(FeedStatus::Dispatched {
        entries: delta.entries.len(),
        record,
    })
}

/// Reader that copies every byte it yields into `copy`.
///
/// A failed copy is kept in `failed` and surfaces as a read error, so the
/// caller can tell staging failures apart from parse failures.
struct Tee<'a, R, W> {
    reader: R,
    copy: &'a mut W,
    failed: Option<io::Error>,
}

impl<'a, R: Read, W: Write> Tee<'a, R, W> {
    fn new(reader: R, copy: &'a mut W) -> Self {
        Self {
            reader,
            copy,
            failed: None,
        }
    }
}

impl<R: Read, W: Write> Read for Tee<'_, R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if let Err(err) = self.copy.write_all(&buf[..n]) {
            let kind = err.kind();
            self.failed = Some(err);
            return Err(io::Error::new(kind, "staging copy failed"));
        }
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
