//! Missing-date resolution for the backfill loop.

use chrono::{Duration, NaiveDate};

/// Produces the ascending list of dates to process for a source.
///
/// Seeded from an existing cache max date, the range is `[max + 1, today]`:
/// the completed date itself is never reprocessed. With no cache state the
/// range restarts at `today - lookback_days` inclusive (the caller drops
/// the stale base table first).
///
/// Pure date math; an empty result means nothing to process.
#[must_use]
pub fn resolve_dates(
    cache_max: Option<NaiveDate>,
    today: NaiveDate,
    lookback_days: i64,
) -> Vec<NaiveDate> {
    let start = match cache_max {
        Some(max) => max + Duration::days(1),
        None => today - Duration::days(lookback_days),
    };

    let mut dates = Vec::new();
    let mut current = start;
    while current <= today {
        dates.push(current);
        current += Duration::days(1);
    }
    dates
}
