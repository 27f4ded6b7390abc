//! `config.yaml` loading and application directories.
//!
//! # Layout
//!
//! ```text
//! <config_dir>/feed-trigger/
//!   config.yaml             (feeds + run command)
//! <data_dir>/feed-trigger/
//!   <url-escaped feed URL>.xml   (one record per feed)
//! ```
//!
//! # API pattern
//!
//! Directories are resolved once via [`AppDirs::from_platform`] and passed
//! down explicitly. Loading has an explicit-path form ([`load_at`]) used by
//! tests and by the `--config` flag.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::APP_NAME;

/// File name of the config document inside the config directory.
pub const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// 1. Config document
// ---------------------------------------------------------------------------

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Feed URLs, processed in this order.
    #[serde(default)]
    pub feeds: Vec<String>,
    /// Command and arguments that receive each delta on stdin.
    #[serde(default)]
    pub run: Vec<String>,
    /// Optional overall HTTP request timeout. No timeout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Parse and validate a config document. `path` is only used for error context.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        match self.run.first() {
            None => Err(ConfigError::EmptyRun {
                path: path.to_path_buf(),
            }),
            Some(program) if program.trim().is_empty() => Err(ConfigError::EmptyProgram {
                path: path.to_path_buf(),
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Load and validate the config at an explicit path.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
/// path + line context) if malformed, `ConfigError::EmptyRun` if `run` is
/// missing or empty.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Config::from_yaml(path, &contents)
}

// ---------------------------------------------------------------------------
// 2. Directories
// ---------------------------------------------------------------------------

/// Config and state directories for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl AppDirs {
    /// `<config_dir>/feed-trigger` and `<data_dir>/feed-trigger` per platform conventions.
    pub fn from_platform() -> Result<Self, ConfigError> {
        let config = dirs::config_dir().ok_or(ConfigError::DirsNotFound)?;
        let data = dirs::data_dir().ok_or(ConfigError::DirsNotFound)?;
        Ok(Self {
            config_dir: config.join(APP_NAME),
            data_dir: data.join(APP_NAME),
        })
    }

    /// `<config_dir>/config.yaml`; pure, no I/O.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Create both directories (mode `0700`) if they do not yet exist.
    ///
    /// Existing directories are left as they are.
    pub fn ensure(&self) -> Result<(), ConfigError> {
        for dir in [&self.config_dir, &self.data_dir] {
            if dir.exists() {
                continue;
            }
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            set_dir_permissions(dir)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs_in(root: &Path) -> AppDirs {
        AppDirs {
            config_dir: root.join("config").join(APP_NAME),
            data_dir: root.join("data").join(APP_NAME),
        }
    }

    #[test]
    fn parses_feeds_and_run() {
        let config = Config::from_yaml(
            Path::new("config.yaml"),
            "feeds:\n  - https://example.com/a.xml\n  - https://example.com/b.xml\nrun: [notify-send, --urgency=low]\n",
        )
        .expect("parse");
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[1], "https://example.com/b.xml");
        assert_eq!(config.run, vec!["notify-send", "--urgency=low"]);
        assert!(config.timeout().is_none());
    }

    #[test]
    fn missing_feeds_defaults_to_empty() {
        let config = Config::from_yaml(Path::new("c.yaml"), "run: [cat]\n").expect("parse");
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn timeout_secs_becomes_duration() {
        let config =
            Config::from_yaml(Path::new("c.yaml"), "run: [cat]\ntimeout_secs: 30\n").expect("parse");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn missing_run_is_rejected() {
        let err = Config::from_yaml(Path::new("c.yaml"), "feeds: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRun { .. }), "got: {err}");
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = Config::from_yaml(Path::new("c.yaml"), "run: ['', arg]\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyProgram { .. }), "got: {err}");
    }

    #[test]
    fn unknown_field_is_a_parse_error() {
        let err = Config::from_yaml(Path::new("c.yaml"), "run: [cat]\nfeed: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn ensure_creates_both_dirs_with_perms() {
        let root = TempDir::new().expect("tempdir");
        let dirs = dirs_in(root.path());
        dirs.ensure().expect("ensure");
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.data_dir.is_dir());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&dirs.data_dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn ensure_is_idempotent() {
        let root = TempDir::new().expect("tempdir");
        let dirs = dirs_in(root.path());
        dirs.ensure().expect("first");
        std::fs::write(dirs.data_dir.join("keep.xml"), "x").unwrap();
        dirs.ensure().expect("second");
        assert!(dirs.data_dir.join("keep.xml").exists());
    }

    #[test]
    fn config_path_is_correct() {
        let dirs = dirs_in(Path::new("/home/u"));
        assert!(dirs.config_path().ends_with("config/feed-trigger/config.yaml"));
    }
}
