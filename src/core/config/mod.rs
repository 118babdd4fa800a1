//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file (first one found, see [`schema`])
//! 3. `$GFI_MINER_TOKENS` (comma-separated, appended to the token pool)
//! 4. CLI flags (not handled here)
//!
//! # Example
//!
//! ```no_run
//! use gfi_miner::core::config::Config;
//!
//! let result = Config::load(None).unwrap();
//! let config = result.config;
//!
//! for repo in config.projects() {
//!     println!("{}", repo);
//! }
//! println!("Store: {}", config.store_path().unwrap().display());
//! ```

pub mod schema;

pub use schema::{GitHubConfig, MinerConfig, StoreConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::RepoId;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GFI_MINER_CONFIG";

/// Environment variable holding extra comma-separated tokens.
pub const TOKENS_ENV: &str = "GFI_MINER_TOKENS";

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default number of concurrent pull-request detail fetches.
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 4;

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

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Path the configuration was read from, if any file was found.
    pub loaded_from: Option<PathBuf>,
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: MinerConfig,
    /// Tokens contributed by the environment
    env_tokens: Vec<String>,
}

impl Config {
    /// Wrap an already-parsed config.
    pub fn from_file_config(file: MinerConfig) -> Self {
        Self {
            file,
            env_tokens: Vec::new(),
        }
    }

    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing, or if a config file
    /// exists but cannot be parsed or fails validation. A missing default
    /// config file is not an error (defaults are used).
    pub fn load(explicit: Option<&Path>) -> Result<ConfigLoadResult, ConfigError> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::locate(),
        };

        let file = match &path {
            Some(path) => Self::read_config(path)?,
            None => MinerConfig::default(),
        };
        file.validate()?;

        let mut config = Self::from_file_config(file);
        config.set_env_tokens(std::env::var(TOKENS_ENV).ok().as_deref());

        Ok(ConfigLoadResult {
            config,
            loaded_from: path,
        })
    }

    /// Find the first existing config file in the default locations.
    fn locate() -> Option<PathBuf> {
        // 1. Check $GFI_MINER_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/gfi-miner/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gfi-miner/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.gfi-miner/config.toml
        let path = Self::default_config_path().ok()?;
        path.exists().then_some(path)
    }

    /// Read and parse a config file.
    pub fn read_config(path: &Path) -> Result<MinerConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Replace the environment-provided tokens from a comma-separated list.
    pub fn set_env_tokens(&mut self, raw: Option<&str>) {
        self.env_tokens = raw
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
    }

    /// Get the canonical config path, `~/.gfi-miner/config.toml`.
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gfi-miner/config.toml"))
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn write_atomic(path: &Path, config: &MinerConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Configured projects. Entries are validated on load.
    pub fn projects(&self) -> Vec<RepoId> {
        self.file
            .projects
            .iter()
            .filter_map(|p| p.parse().ok())
            .collect()
    }

    /// The credential pool: file tokens followed by environment tokens.
    pub fn tokens(&self) -> Vec<String> {
        self.file
            .tokens
            .iter()
            .chain(self.env_tokens.iter())
            .cloned()
            .collect()
    }

    /// Repositories synced concurrently.
    ///
    /// Defaults to 1 (sequential).
    pub fn jobs(&self) -> usize {
        self.file.jobs.unwrap_or(1)
    }

    /// GitHub API base URL.
    ///
    /// Defaults to `https://api.github.com`.
    pub fn api_base(&self) -> &str {
        self.file
            .github
            .as_ref()
            .and_then(|g| g.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
    }

    /// Concurrent pull-request detail fetches.
    ///
    /// Defaults to 4.
    pub fn detail_concurrency(&self) -> usize {
        self.file
            .github
            .as_ref()
            .and_then(|g| g.detail_concurrency)
            .unwrap_or(DEFAULT_DETAIL_CONCURRENCY)
    }

    /// Root directory of the document store.
    ///
    /// Defaults to `~/.gfi-miner/store`.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = self.file.store.as_ref().and_then(|s| s.path.clone()) {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".gfi-miner/store"))
    }
}
