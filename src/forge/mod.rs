//! forge
//!
//! Read-only access to repositories on a hosting service.
//!
//! # Architecture
//!
//! The `RepoFetcher` trait defines the interface the sync orchestrator and
//! resolution engine read through. A fetcher is bound to one repository and
//! one credential; the batch runner builds one per repository from the
//! token pool.
//!
//! - Fetch failures abort the repository's sync without advancing its watermark
//! - Fetchers never write; all persistence goes through the document store
//!
//! # Modules
//!
//! - `traits`: Core `RepoFetcher` trait and `FetchError`
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing
//!
//! # Example
//!
//! ```ignore
//! use gfi_miner::forge::{github::GitHubFetcher, RepoFetcher};
//!
//! let fetcher = GitHubFetcher::new(token, "octocat/hello-world".parse()?);
//! let issues = fetcher.get_issues(since).await?;
//! println!("{} issues touched", issues.len());
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
