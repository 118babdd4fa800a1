//! forge::traits
//!
//! Repository fetcher trait for reading data from a hosting service.
//!
//! # Design
//!
//! The `RepoFetcher` trait is async because every operation is network I/O.
//! A fetcher is bound to exactly one repository. All methods return
//! `Result` and never retry on their own: transient failures surface to the
//! caller, which abandons the repository sync without advancing its
//! watermark.
//!
//! # Example
//!
//! ```ignore
//! use gfi_miner::forge::{RepoFetcher, FetchError};
//!
//! async fn newest_commits(fetcher: &dyn RepoFetcher) -> Result<(), FetchError> {
//!     let since = chrono::Utc::now() - chrono::Duration::days(7);
//!     for commit in fetcher.get_commits(since).await? {
//!         println!("{} {}", commit.sha, commit.message);
//!     }
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{Commit, Issue, IssueDetail, PullDetail, RepoId, RepoStats, Star};

/// Errors from fetch operations.
///
/// These error types map to common failure modes when talking to a
/// hosting service like GitHub.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Read-only access to one repository on a hosting service.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so pull-request details can be
/// fetched from concurrent futures.
///
/// # Time windows
///
/// `since` arguments are inclusive lower bounds. Implementations may return
/// documents older than `since` when the service cannot filter precisely
/// (GitHub filters issues by update time); callers upsert by natural key so
/// extra documents are harmless.
#[async_trait]
pub trait RepoFetcher: Send + Sync {
    /// The repository this fetcher reads.
    fn repo(&self) -> &RepoId;

    /// Repository-level attributes.
    async fn get_stats(&self) -> Result<RepoStats, FetchError>;

    /// Remaining request budget for the current credential.
    async fn get_rate_limit(&self) -> Result<u64, FetchError>;

    /// Stars given at or after `since`.
    async fn get_stars(&self, since: DateTime<Utc>) -> Result<Vec<Star>, FetchError>;

    /// Commits on the default branch since `since`.
    async fn get_commits(&self, since: DateTime<Utc>) -> Result<Vec<Commit>, FetchError>;

    /// Issues and pull requests touched since `since`.
    async fn get_issues(&self, since: DateTime<Utc>) -> Result<Vec<Issue>, FetchError>;

    /// Comment text and constituent commits of a pull request.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the pull request doesn't exist
    async fn get_pull_detail(&self, number: u64) -> Result<PullDetail, FetchError>;

    /// Timeline events of an issue.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the issue doesn't exist
    async fn get_issue_detail(&self, number: u64) -> Result<IssueDetail, FetchError>;
}
