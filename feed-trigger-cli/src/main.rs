//! feed-trigger: pipe new feed entries into a command.
//!
//! # Usage
//!
//! ```text
//! feed-trigger [--config-dir <DIR>] [--state-dir <DIR>] [-v | -q]
//! ```
//!
//! Reads `<config-dir>/config.yaml`:
//!
//! ```yaml
//! feeds:
//!   - https://example.com/feed.xml
//! run: [sh, -c, "jq -r '.items[].title'"]
//! ```
//!
//! and, for every feed with entries not seen on a previous successful run,
//! runs `run` once with those entries as JSON on stdin. Exits `1` if any
//! feed failed. Meant to be invoked periodically by cron or a systemd timer.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use feed_trigger_core::{config, AppDirs};
use feed_trigger_sync::{pipeline, FeedStore, HttpFetcher};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "feed-trigger",
    version,
    about = "Run a command with the new entries of RSS/Atom feeds",
    long_about = None,
)]
struct Cli {
    /// Directory holding config.yaml [default: <platform config dir>/feed-trigger].
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Directory holding per-feed records [default: <platform data dir>/feed-trigger].
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Log debug detail to stderr.
    #[arg(long, short = 'v', conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(long, short = 'q')]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    /// Platform directories, with either one replaced by its flag.
    fn app_dirs(&self) -> Result<AppDirs> {
        if let (Some(config_dir), Some(state_dir)) = (&self.config_dir, &self.state_dir) {
            return Ok(AppDirs {
                config_dir: config_dir.clone(),
                data_dir: state_dir.clone(),
            });
        }
        let platform = AppDirs::from_platform()?;
        Ok(AppDirs {
            config_dir: self.config_dir.clone().unwrap_or(platform.config_dir),
            data_dir: self.state_dir.clone().unwrap_or(platform.data_dir),
        })
    }

    fn run(self) -> Result<ExitCode> {
        let dirs = self.app_dirs()?;
        dirs.ensure().context("failed to prepare app directories")?;

        let config = config::load_at(&dirs.config_path()).context("failed to read config")?;
        tracing::debug!(
            feeds = config.feeds.len(),
            state_dir = %dirs.data_dir.display(),
            "config loaded"
        );

        let fetcher = HttpFetcher::new(config.timeout());
        let store = FeedStore::new(&dirs.data_dir);
        let summary = pipeline::run(&fetcher, &store, &config);
        Ok(ExitCode::from(summary.exit_code()))
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    cli.run()
}

/// stderr only: stdout is shared with the dispatched command.
fn init_tracing(default_level: &str) {
    use std::io::IsTerminal;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}
