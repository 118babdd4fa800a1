//! resolve::registry
//!
//! Candidate resolutions keyed by issue number.
//!
//! Matchers record candidates in priority order: commit candidates first,
//! then pull request candidates. A later record for the same issue replaces
//! the earlier one, so pull request evidence always wins over commit
//! evidence. Draining yields resolutions in ascending issue order.

use std::collections::BTreeMap;

use crate::core::types::{ResolvedIn, Resolution};

/// Accumulates at most one resolution per issue.
#[derive(Debug, Default)]
pub struct ResolutionRegistry {
    entries: BTreeMap<u64, Resolution>,
    replaced: usize,
}

impl ResolutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `resolution`, replacing any earlier candidate for its issue.
    /// Returns the replaced candidate.
    pub fn record(&mut self, resolution: Resolution) -> Option<Resolution> {
        let previous = self.entries.insert(resolution.number, resolution);
        if previous.is_some() {
            self.replaced += 1;
        }
        previous
    }

    /// Record candidates in order.
    pub fn record_all(&mut self, resolutions: impl IntoIterator<Item = Resolution>) {
        for resolution in resolutions {
            self.record(resolution);
        }
    }

    /// Candidate for `number`, if any.
    pub fn get(&self, number: u64) -> Option<&Resolution> {
        self.entries.get(&number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many records replaced an earlier candidate.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    /// Number of candidates resolved through a pull request.
    pub fn pull_request_count(&self) -> usize {
        self.entries
            .values()
            .filter(|r| matches!(r.resolved_in, ResolvedIn::PullRequest(_)))
            .count()
    }

    /// Drain into resolutions sorted by issue number.
    pub fn into_resolutions(self) -> Vec<Resolution> {
        self.entries.into_values().collect()
    }
}
