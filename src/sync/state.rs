//! sync::state
//!
//! Per-repository sync watermark.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::core::types::RepoRecord;

/// Whether a repository has completed a sync, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No successful sync yet; the next run covers the full history.
    NeverSynced,
    /// The last successful sync started at `since`.
    Synced { since: DateTime<Utc> },
}

impl SyncState {
    /// Derive the state from a stored record.
    pub fn of(record: &RepoRecord) -> Self {
        match record.updated_at {
            Some(since) => SyncState::Synced { since },
            None => SyncState::NeverSynced,
        }
    }

    /// Lower bound of the next fetch window.
    ///
    /// A never-synced repository starts from its creation time.
    pub fn since(&self, repo_created_at: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            SyncState::NeverSynced => repo_created_at,
            SyncState::Synced { since } => *since,
        }
    }

    pub fn is_first_sync(&self) -> bool {
        matches!(self, SyncState::NeverSynced)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::NeverSynced => write!(f, "never synced"),
            SyncState::Synced { since } => write!(f, "synced at {}", since.to_rfc3339()),
        }
    }
}
