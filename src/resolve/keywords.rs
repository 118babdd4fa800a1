//! resolve::keywords
//!
//! Closing-keyword grammar.
//!
//! A text closes issue `N` when its lower-cased form contains one of
//! `close`, `closes`, `closed`, `fix`, `fixes`, `fixed`, `resolve`,
//! `resolves`, `resolved`, followed by exactly one space, `#` and the
//! number in ASCII digits. There is no word boundary check: `prefixes #3`
//! counts.
//!
//! ```
//! use gfi_miner::resolve::keywords::closing_references;
//!
//! assert_eq!(closing_references("Fixes #12, closes #7 and fixes #12"), vec![12, 7, 12]);
//! assert!(closing_references("fixes#12").is_empty());
//! ```

use std::sync::LazyLock;

use regex::Regex;

static CLOSING_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(close[sd]?|fix(es|ed)?|resolve[sd]?) #([0-9]+)")
        .expect("closing-keyword pattern compiles")
});

/// Issue numbers closed by `text`, left to right, duplicates kept.
///
/// Numbers too large for `u64` are skipped.
pub fn closing_references(text: &str) -> Vec<u64> {
    let lowered = text.to_lowercase();
    CLOSING_REFERENCE
        .captures_iter(&lowered)
        .filter_map(|caps| caps.get(3)?.as_str().parse().ok())
        .collect()
}

/// Whether `text` closes issue `number`.
pub fn closes(text: &str, number: u64) -> bool {
    closing_references(text).contains(&number)
}
