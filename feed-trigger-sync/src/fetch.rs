//! Feed retrieval over HTTP.
//!
//! [`FeedSource`] is the seam between the pipeline and the network; the
//! production implementation is [`HttpFetcher`] (a blocking `ureq` agent
//! shared by every feed in a run).

use std::io::Read;
use std::time::Duration;

use crate::error::SyncError;

/// Largest error body kept for diagnostics.
const MAX_ERROR_BODY: u64 = 4 * 1024;

/// Something that can produce the raw bytes of a feed.
pub trait FeedSource {
    /// Open a byte stream for `url`.
    ///
    /// Fails with [`SyncError::Fetch`] on transport failure and
    /// [`SyncError::Status`] on a non-2xx response.
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>, SyncError>;
}

/// HTTP GET via `ureq`. Follows the client's default redirect policy; no retries.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// `timeout` bounds each whole request; `None` waits indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new()
            .user_agent(concat!("feed-trigger/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FeedSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>, SyncError> {
        tracing::debug!(url, "fetching feed");
        match self.agent.get(url).call() {
            Ok(response) if response.status() / 100 == 2 => Ok(Box::new(response.into_reader())),
            Ok(response) => Err(status_error(url, response)),
            Err(ureq::Error::Status(_, response)) => Err(status_error(url, response)),
            Err(ureq::Error::Transport(transport)) => Err(SyncError::Fetch {
                url: url.to_string(),
                source: Box::new(transport),
            }),
        }
    }
}

/// Build a [`SyncError::Status`], reading the body best-effort.
fn status_error(url: &str, response: ureq::Response) -> SyncError {
    let status = response.status();
    let mut body = String::new();
    let read = response
        .into_reader()
        .take(MAX_ERROR_BODY)
        .read_to_string(&mut body);
    if let Err(err) = read {
        tracing::debug!(url, error = %err, "could not read error body");
        body.clear();
    }
    SyncError::Status {
        url: url.to_string(),
        status,
        body,
    }
}
