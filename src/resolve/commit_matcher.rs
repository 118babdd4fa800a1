//! resolve::commit_matcher
//!
//! Resolution candidates from commit messages.
//!
//! Commits are replayed in `(authored_at, sha)` order. A commit whose
//! message closes issue `N` is a candidate for `N` whenever `N` is among
//! the newly closed issues. Authored times come from the author's clock,
//! so they are not compared against the closure. Candidates are emitted in
//! replay order, so when recorded into a registry the chronologically last
//! claim wins.

use std::collections::HashSet;

use super::author_index::CommitAuthorIndex;
use super::keywords::closing_references;
use crate::core::types::{Commit, Confidence, Issue, ResolvedIn, Resolution};

/// Candidates for `closed_issues` from `commits`, in replay order.
///
/// Commits without a linked author produce a low-confidence placeholder
/// with no resolver and a zero prior-commit count.
pub fn match_commits(
    closed_issues: &[Issue],
    commits: &[Commit],
    index: &CommitAuthorIndex<'_>,
) -> Vec<Resolution> {
    let closed: HashSet<u64> = closed_issues
        .iter()
        .filter(|issue| issue.closed_at.is_some())
        .map(|issue| issue.number)
        .collect();
    if closed.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<&Commit> = commits.iter().collect();
    ordered.sort_by(|a, b| (a.authored_at, &a.sha).cmp(&(b.authored_at, &b.sha)));

    let mut candidates = Vec::new();
    for commit in ordered {
        for number in closing_references(&commit.message) {
            if closed.contains(&number) {
                candidates.push(candidate(number, commit, index));
            }
        }
    }
    candidates
}

fn candidate(number: u64, commit: &Commit, index: &CommitAuthorIndex<'_>) -> Resolution {
    match commit.author.as_deref() {
        Some(author) => Resolution {
            number,
            resolver: Some(author.to_string()),
            resolved_in: ResolvedIn::Commit(commit.sha.clone()),
            resolver_commit_num: index.count_before(author, commit.authored_at),
            confidence: Confidence::High,
        },
        None => Resolution {
            number,
            resolver: None,
            resolved_in: ResolvedIn::Commit(commit.sha.clone()),
            resolver_commit_num: 0,
            confidence: Confidence::Low,
        },
    }
}
