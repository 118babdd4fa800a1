//! sync
//!
//! Incremental mining of repositories into the document store.
//!
//! # Modules
//!
//! - `state`: per-repository watermark ([`SyncState`])
//! - `monthly`: calendar-month aggregation ([`count_by_month`])
//! - `update`: one repository sync ([`update_repo`])
//! - `batch`: many repositories with a credential pool ([`run_batch`])

mod batch;
mod monthly;
mod state;
mod update;

pub use batch::{github_fetchers, run_batch, BatchOptions, BatchReport, RepoOutcome, TokenPool};
pub use monthly::count_by_month;
pub use state::SyncState;
pub use update::{update_repo, SyncError, SyncOptions, SyncReport};
