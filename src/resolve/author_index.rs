//! resolve::author_index
//!
//! Per-author commit history for prior-contribution counts.
//!
//! Built once per sync in O(n log n); each lookup is a binary search over
//! the author's commits sorted by `(authored_at, sha)`. Commits without a
//! linked author are never indexed.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::core::types::Commit;

/// Commits grouped by author login, each group in chronological order.
#[derive(Debug, Default)]
pub struct CommitAuthorIndex<'a> {
    by_author: HashMap<&'a str, Vec<&'a Commit>>,
}

impl<'a> CommitAuthorIndex<'a> {
    /// Index `commits`, given in any order.
    pub fn new(commits: impl IntoIterator<Item = &'a Commit>) -> Self {
        let mut by_author: HashMap<&'a str, Vec<&'a Commit>> = HashMap::new();
        for commit in commits {
            if let Some(author) = commit.author.as_deref() {
                by_author.entry(author).or_default().push(commit);
            }
        }
        for list in by_author.values_mut() {
            list.sort_by(|a, b| (a.authored_at, &a.sha).cmp(&(b.authored_at, &b.sha)));
        }
        Self { by_author }
    }

    /// Number of distinct authors.
    pub fn author_count(&self) -> usize {
        self.by_author.len()
    }

    /// Logins of every indexed author.
    pub fn authors(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.by_author.keys().copied()
    }

    /// `author`'s commits authored strictly before `cutoff`, oldest first.
    pub fn commits_before(&self, author: &str, cutoff: DateTime<Utc>) -> &[&'a Commit] {
        match self.by_author.get(author) {
            Some(list) => {
                let end = list.partition_point(|c| c.authored_at < cutoff);
                &list[..end]
            }
            None => &[],
        }
    }

    /// Count of `author`'s commits authored strictly before `cutoff`.
    pub fn count_before(&self, author: &str, cutoff: DateTime<Utc>) -> u64 {
        self.commits_before(author, cutoff).len() as u64
    }

    /// Like [`count_before`](Self::count_before), ignoring commits whose SHA
    /// is in `excluded`.
    pub fn count_before_excluding(
        &self,
        author: &str,
        cutoff: DateTime<Utc>,
        excluded: &HashSet<&str>,
    ) -> u64 {
        self.commits_before(author, cutoff)
            .iter()
            .filter(|c| !excluded.contains(c.sha.as_str()))
            .count() as u64
    }
}
