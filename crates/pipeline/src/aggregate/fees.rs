//! Accrued-fees passthrough: the dump's running fee totals are copied to
//! the cache verbatim, keyed by partition date. The column set is whatever
//! the partition carries, which changes as fee categories are added.

use chrono::NaiveDate;
use hl_stats_core::{RowSet, Source};

use crate::decode::DynamicTable;

#[must_use]
pub fn aggregate(date: NaiveDate, table: &DynamicTable) -> RowSet {
    table.to_cache_rowset(Source::TotalAccruedFees.cache_table(), date)
}
