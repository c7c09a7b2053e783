//! Object-store key construction for date partitions.

use chrono::NaiveDate;
use hl_stats_core::Source;

/// Key of a scalar source's daily partition: `{prefix}/{YYYYMMDD}.csv.lz4`.
#[must_use]
pub fn scalar_key(source: Source, date: NaiveDate) -> String {
    format!("{}/{}.csv.lz4", source.key_prefix(), date.format("%Y%m%d"))
}

/// Key of one market-data shard:
/// `market_data/{YYYYMMDD}/{hour}/l2Book/{instrument}.lz4`, hour in [0, 24).
#[must_use]
pub fn market_data_key(date: NaiveDate, hour: u32, instrument: &str) -> String {
    format!(
        "{}/{}/{hour}/l2Book/{instrument}.lz4",
        Source::MarketData.key_prefix(),
        date.format("%Y%m%d")
    )
}
