//! Property-based tests for the resolution engine building blocks.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use gfi_miner::core::types::{Commit, Confidence, ResolvedIn, Resolution};
use gfi_miner::resolve::author_index::CommitAuthorIndex;
use gfi_miner::resolve::keywords::{closes, closing_references};
use gfi_miner::resolve::registry::ResolutionRegistry;
use gfi_miner::sync::count_by_month;

const KEYWORDS: &[&str] = &[
    "close", "closes", "closed", "fix", "fixes", "fixed", "resolve", "resolves", "resolved",
];

/// Strategy for a closing keyword in random letter case.
fn keyword() -> impl Strategy<Value = String> {
    (prop::sample::select(KEYWORDS), any::<u64>()).prop_map(|(kw, mask)| {
        kw.chars()
            .enumerate()
            .map(|(i, c)| {
                if mask & (1 << i) != 0 {
                    c.to_ascii_uppercase()
                } else {
                    c
                }
            })
            .collect()
    })
}

/// Text that cannot contain a `#`.
fn filler() -> impl Strategy<Value = String> {
    "[a-zA-Z ,.:]{0,30}"
}

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Strategy for commits by a small set of authors, some anonymous.
fn commits() -> impl Strategy<Value = Vec<Commit>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.8, prop::sample::select(vec!["alice", "bob", "carol"])),
            0i64..1_000,
        ),
        0..40,
    )
    .prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, (author, at))| Commit {
                sha: format!("{:040x}", i),
                author: author.map(str::to_string),
                authored_at: ts(at),
                committer: None,
                committed_at: ts(at),
                message: String::new(),
            })
            .collect()
    })
}

proptest! {
    /// A keyword, one space, `#` and a number always closes that number.
    #[test]
    fn keyword_reference_closes(
        prefix in filler(),
        kw in keyword(),
        number in 0u64..1_000_000_000,
        suffix in filler(),
    ) {
        let text = format!("{}{} #{}{}", prefix, kw, number, suffix);
        prop_assert!(closes(&text, number));
    }

    /// Without exactly one space before `#`, nothing is closed.
    #[test]
    fn spacing_must_be_exact(
        kw in keyword(),
        number in 0u64..1_000_000,
        spaces in prop::sample::select(vec!["", "  ", "\t"]),
    ) {
        let text = format!("{}{}#{}", kw, spaces, number);
        prop_assert!(closing_references(&text).is_empty());
    }

    /// A keyword after the reference closes nothing.
    #[test]
    fn keyword_must_precede_reference(kw in keyword(), number in 0u64..1_000_000) {
        let text = format!("#{} {}", number, kw);
        prop_assert!(closing_references(&text).is_empty());
    }

    /// Matching ignores letter case.
    #[test]
    fn case_insensitive(text in "[a-zA-Z #0-9]{0,60}") {
        prop_assert_eq!(
            closing_references(&text),
            closing_references(&text.to_ascii_uppercase())
        );
    }

    /// Text without `#` never closes anything.
    #[test]
    fn no_hash_no_reference(text in filler()) {
        prop_assert!(closing_references(&text).is_empty());
    }

    /// Index counts agree with a linear scan.
    #[test]
    fn index_matches_linear_count(commits in commits(), cutoff in 0i64..1_000) {
        let index = CommitAuthorIndex::new(&commits);
        let cutoff = ts(cutoff);

        for author in ["alice", "bob", "carol", "nobody"] {
            let expected = commits
                .iter()
                .filter(|c| c.author.as_deref() == Some(author) && c.authored_at < cutoff)
                .count() as u64;
            prop_assert_eq!(index.count_before(author, cutoff), expected);
        }
    }

    /// Excluding SHAs removes exactly those commits from the count.
    #[test]
    fn exclusion_subtracts(commits in commits(), cutoff in 0i64..1_000, keep_every in 1usize..4) {
        let index = CommitAuthorIndex::new(&commits);
        let cutoff = ts(cutoff);
        let excluded: HashSet<&str> = commits
            .iter()
            .step_by(keep_every)
            .map(|c| c.sha.as_str())
            .collect();

        for author in ["alice", "bob", "carol"] {
            let expected = commits
                .iter()
                .filter(|c| {
                    c.author.as_deref() == Some(author)
                        && c.authored_at < cutoff
                        && !excluded.contains(c.sha.as_str())
                })
                .count() as u64;
            prop_assert_eq!(index.count_before_excluding(author, cutoff, &excluded), expected);
        }
    }

    /// The registry keeps the last candidate per issue, ascending by number.
    #[test]
    fn registry_last_write_wins(numbers in prop::collection::vec(0u64..20, 0..50)) {
        let mut registry = ResolutionRegistry::new();
        for (i, number) in numbers.iter().enumerate() {
            registry.record(Resolution {
                number: *number,
                resolver: Some(format!("user{}", i)),
                resolved_in: ResolvedIn::PullRequest(i as u64),
                resolver_commit_num: 0,
                confidence: Confidence::High,
            });
        }

        let distinct: HashSet<u64> = numbers.iter().copied().collect();
        let resolutions = registry.into_resolutions();
        prop_assert_eq!(resolutions.len(), distinct.len());
        prop_assert!(resolutions.windows(2).all(|w| w[0].number < w[1].number));

        for resolution in &resolutions {
            let last = numbers.iter().rposition(|n| *n == resolution.number).unwrap();
            prop_assert_eq!(&resolution.resolved_in, &ResolvedIn::PullRequest(last as u64));
        }
    }

    /// Monthly buckets partition the input.
    #[test]
    fn monthly_counts_sum_to_input(secs in prop::collection::vec(0i64..2_000_000_000, 0..60)) {
        let counts = count_by_month(secs.iter().map(|s| ts(*s)));
        let total: u64 = counts.iter().map(|c| c.count).sum();
        prop_assert_eq!(total, secs.len() as u64);
        prop_assert!(counts.windows(2).all(|w| w[0].month < w[1].month));
    }
}
