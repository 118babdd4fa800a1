//! sync::monthly
//!
//! Calendar-month aggregation for repository time series.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::core::types::MonthCount;

/// Count `times` per UTC calendar month.
///
/// One bucket per month present in the input, ascending, with no empty
/// months filled in. Each bucket is labelled by the first instant of its
/// month.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use gfi_miner::sync::count_by_month;
///
/// let counts = count_by_month([
///     Utc.with_ymd_and_hms(2021, 1, 20, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2021, 1, 5, 0, 0, 0).unwrap(),
/// ]);
/// assert_eq!(counts.len(), 1);
/// assert_eq!(counts[0].month, Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
/// assert_eq!(counts[0].count, 2);
/// ```
pub fn count_by_month(times: impl IntoIterator<Item = DateTime<Utc>>) -> Vec<MonthCount> {
    let mut buckets: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for t in times {
        *buckets.entry((t.year(), t.month())).or_default() += 1;
    }

    buckets
        .into_iter()
        .filter_map(|((year, month), count)| {
            let month = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()?;
            Some(MonthCount { month, count })
        })
        .collect()
}
