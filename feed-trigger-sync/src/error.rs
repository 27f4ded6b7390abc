//! Error types for feed-trigger-sync.
//!
//! Every variant is feed-scoped: it aborts the current feed only.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// All errors that can arise while synchronizing one feed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport failure before a response was received.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: Box<ureq::Transport>,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} answered {status}{}", body_suffix(.body))]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Freshly fetched bytes are not a feed.
    #[error("failed to parse feed from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: feed_rs::parser::ParseFeedError,
    },

    /// A stored record exists but no longer parses.
    #[error("stored record {path} is corrupt: {source}")]
    CorruptRecord {
        path: PathBuf,
        #[source]
        source: feed_rs::parser::ParseFeedError,
    },

    /// The configured command could not be started.
    #[error("failed to start command `{program}`: {source}")]
    CommandStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command started but its exit status could not be collected.
    #[error("failed to wait for command `{program}`: {source}")]
    CommandWait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The configured command ran but did not succeed.
    #[error("command `{program}` failed: {status}")]
    CommandFailed { program: String, status: ExitStatus },

    /// Streaming the delta into the command's stdin failed.
    #[error("failed to write feed to `{program}` stdin: {source}")]
    Write {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The staged record could not be moved into place.
    #[error("failed to commit record {path}: {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while staging or reading records, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Delta serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pipeline stage an error belongs to; used as log context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Parse,
    Command,
    Write,
    Commit,
    Io,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Parse => "parse",
            Stage::Command => "command",
            Stage::Write => "write",
            Stage::Commit => "commit",
            Stage::Io => "io",
        };
        f.write_str(name)
    }
}

impl SyncError {
    pub fn stage(&self) -> Stage {
        match self {
            SyncError::Fetch { .. } | SyncError::Status { .. } => Stage::Fetch,
            SyncError::Parse { .. } | SyncError::CorruptRecord { .. } => Stage::Parse,
            SyncError::CommandStart { .. }
            | SyncError::CommandWait { .. }
            | SyncError::CommandFailed { .. } => Stage::Command,
            SyncError::Write { .. } | SyncError::Json(_) => Stage::Write,
            SyncError::Commit { .. } => Stage::Commit,
            SyncError::Io { .. } => Stage::Io,
        }
    }
}

fn body_suffix(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        String::new()
    } else {
        format!(": \"{body}\"")
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_includes_body_when_present() {
        let err = SyncError::Status {
            url: "https://example.com/feed".to_string(),
            status: 503,
            body: "maintenance\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "https://example.com/feed answered 503: \"maintenance\""
        );
        assert_eq!(err.stage(), Stage::Fetch);
    }

    #[test]
    fn status_error_without_body() {
        let err = SyncError::Status {
            url: "https://example.com/feed".to_string(),
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.to_string(), "https://example.com/feed answered 404");
    }

    #[test]
    fn wait_failure_is_distinct_from_start_failure() {
        let err = SyncError::CommandWait {
            program: "handler".to_string(),
            source: std::io::Error::other("interrupted"),
        };
        assert_eq!(
            err.to_string(),
            "failed to wait for command `handler`: interrupted"
        );
        assert_eq!(err.stage(), Stage::Command);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Commit.to_string(), "commit");
        assert_eq!(
            io_err("/tmp/x", std::io::Error::other("boom")).stage().to_string(),
            "io"
        );
    }
}
