//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! An explicit path (`--config`) wins. Otherwise searched in order:
//! 1. `$FORKSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/forksync/config.toml`
//! 3. `~/.forksync/config.toml`
//!
//! A missing file is not an error; defaults are used.
//!
//! # Example
//!
//! ```no_run
//! use forksync::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("API base: {}", config.api_base());
//! println!("Draft PRs: {}", config.pull_request_draft());
//! ```

pub mod schema;

pub use schema::{FileConfig, PullRequestDefaults, SyncDefaults};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default User-Agent header value.
pub const DEFAULT_USER_AGENT: &str = "forksync";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Values read from the config file
    pub file: FileConfig,
    /// Path the file was loaded from, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration.
    ///
    /// If `explicit` is given it must exist. Otherwise the standard
    /// locations are searched and defaults are used when none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(|key| std::env::var(key).ok(), dirs::home_dir()),
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read and validate a specific config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");

        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file among the standard locations.
    fn locate(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Option<PathBuf> {
        let candidates = [
            env("FORKSYNC_CONFIG").map(PathBuf::from),
            env("XDG_CONFIG_HOME").map(|xdg| PathBuf::from(xdg).join("forksync/config.toml")),
            home.map(|home| home.join(".forksync/config.toml")),
        ];

        candidates.into_iter().flatten().find(|path| path.exists())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Get the REST API base URL.
    ///
    /// Defaults to `https://api.github.com`.
    pub fn api_base(&self) -> &str {
        self.file.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// Get the User-Agent header value.
    pub fn user_agent(&self) -> &str {
        self.file.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Whether branch sync force-updates by default.
    ///
    /// Defaults to `false`.
    pub fn sync_force(&self) -> bool {
        self.file
            .sync
            .as_ref()
            .and_then(|s| s.force)
            .unwrap_or(false)
    }

    /// Whether pull requests are opened as drafts by default.
    ///
    /// Defaults to `false`.
    pub fn pull_request_draft(&self) -> bool {
        self.file
            .pull_request
            .as_ref()
            .and_then(|p| p.draft)
            .unwrap_or(false)
    }

    /// Get the path the config was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
