//! # feed-trigger-sync
//!
//! Per-feed synchronization: fetch → stage → diff → dispatch → commit.
//!
//! Call [`pipeline::run`] to process every configured feed in order, or
//! [`pipeline::sync_feed`] for a single URL. The building blocks are
//! exposed for reuse and testing:
//!
//! - [`fetch`]: HTTP retrieval behind the [`FeedSource`] seam
//! - [`parse`]: raw bytes → [`feed_trigger_core::FeedSnapshot`]
//! - [`store`]: per-URL records with atomic replace
//! - [`diff`]: entries new since the previous snapshot
//! - [`dispatch`]: stream a delta into the configured command

pub mod diff;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod store;

pub use error::{Stage, SyncError};
pub use fetch::{FeedSource, HttpFetcher};
pub use pipeline::{FeedOutcome, FeedStatus, RunSummary};
pub use store::FeedStore;
