//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order of precedence:
//! 1. `--config <path>` on the command line
//! 2. `$GFI_MINER_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/gfi-miner/config.toml`
//! 4. `~/.gfi-miner/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing: every project must be an
//! `owner/name` identifier and concurrency limits must be positive.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::RepoId;

/// Miner configuration.
///
/// # Example
///
/// ```toml
/// projects = ["rust-lang/rust", "tokio-rs/tokio"]
/// tokens = ["ghp_first", "ghp_second"]
/// jobs = 2
///
/// [github]
/// api_base = "https://api.github.com"
/// detail_concurrency = 4
///
/// [store]
/// path = "/var/lib/gfi-miner"
/// ```
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MinerConfig {
    /// Repositories to mine, as `owner/name`
    pub projects: Vec<String>,

    /// Credential pool, rotated across repositories
    pub tokens: Vec<String>,

    /// Repositories synced concurrently
    pub jobs: Option<usize>,

    /// GitHub client settings
    pub github: Option<GitHubConfig>,

    /// Document store settings
    pub store: Option<StoreConfig>,
}

// Tokens stay out of Debug output.
impl std::fmt::Debug for MinerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinerConfig")
            .field("projects", &self.projects)
            .field("tokens", &format_args!("[{} redacted]", self.tokens.len()))
            .field("jobs", &self.jobs)
            .field("github", &self.github)
            .field("store", &self.store)
            .finish()
    }
}

impl MinerConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for project in &self.projects {
            project.parse::<RepoId>().map_err(|e| {
                ConfigError::InvalidValue(format!("invalid project '{}': {}", project, e))
            })?;
        }

        if self.jobs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "jobs must be at least 1".to_string(),
            ));
        }

        if self.tokens.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "tokens cannot contain empty entries".to_string(),
            ));
        }

        if let Some(github) = &self.github {
            github.validate()?;
        }

        Ok(())
    }
}

/// GitHub client settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubConfig {
    /// API base URL (GitHub Enterprise installations differ)
    pub api_base: Option<String>,

    /// Concurrent pull-request detail fetches per repository
    pub detail_concurrency: Option<usize>,
}

impl GitHubConfig {
    /// Validate the GitHub settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            if base.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "github.api_base cannot be empty".to_string(),
                ));
            }
        }
        if self.detail_concurrency == Some(0) {
            return Err(ConfigError::InvalidValue(
                "github.detail_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Document store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Root directory of the document store
    pub path: Option<PathBuf>,
}
