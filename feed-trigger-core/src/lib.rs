//! feed-trigger core library: feed value types, configuration, app directories.
//!
//! - [`types`]: snapshot / entry value types with structural equality
//! - [`config`]: `config.yaml` loading and validation, [`AppDirs`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppDirs, Config};
pub use error::ConfigError;
pub use types::{Category, Content, Entry, FeedKind, FeedMeta, FeedSnapshot, Link, Person};

/// Directory name used under the platform config and data directories.
pub const APP_NAME: &str = "feed-trigger";
