//! HLP vault position aggregation.
//!
//! The positions partition is wide: a `time` column plus one size column
//! per coin. Sizes are valued at the oracle price from the same date's
//! asset-contexts partition, matched on (time, coin), then averaged per
//! coin over the day. Samples with no matching oracle price are dropped.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::decode::DynamicTable;
use crate::models::AssetCtxRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::HlpPositions.cache_table(),
        vec![
            Column::new("coin", ColumnType::Text),
            Column::new("ntl", ColumnType::Double),
            Column::new("ntl_abs", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

#[derive(Default)]
struct Acc {
    ntl_sum: f64,
    abs_sum: f64,
    count: u64,
}

pub fn aggregate(
    date: NaiveDate,
    asset_ctxs: &[AssetCtxRow],
    positions: &DynamicTable,
) -> Result<RowSet> {
    let time_col = positions
        .column_index("time")
        .context("positions partition has no time column")?;

    let mut oracle_px: HashMap<(&str, &str), f64> = HashMap::new();
    for ctx in asset_ctxs {
        oracle_px.insert((ctx.time.as_str(), ctx.coin.as_str()), ctx.oracle_px);
    }

    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for row_idx in 0..positions.rows.len() {
        let Some(time) = positions.key_text(row_idx, time_col) else {
            continue;
        };
        for (col_idx, coin) in positions.headers.iter().enumerate() {
            if col_idx == time_col {
                continue;
            }
            let Some(size) = positions.double(row_idx, col_idx) else {
                continue;
            };
            let Some(px) = oracle_px.get(&(time.as_str(), coin.as_str())) else {
                continue;
            };
            let ntl = size * px;
            let acc = groups.entry(coin.clone()).or_default();
            acc.ntl_sum += ntl;
            acc.abs_sum += ntl.abs();
            acc.count += 1;
        }
    }

    let mut set = RowSet::new(cache_schema());
    for (coin, acc) in groups {
        let n = acc.count as f64;
        set.push(vec![
            SqlValue::Text(coin),
            SqlValue::Double(acc.ntl_sum / n),
            SqlValue::Double(acc.abs_sum / n),
            SqlValue::Date(date),
        ]);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_dynamic_csv;

    fn ctx(time: &str, coin: &str, oracle_px: f64) -> AssetCtxRow {
        AssetCtxRow {
            time: time.to_string(),
            coin: coin.to_string(),
            funding: 0.0,
            open_interest: 0.0,
            prev_day_px: 0.0,
            day_ntl_vlm: 0.0,
            premium: None,
            oracle_px,
            mark_px: oracle_px,
            mid_px: None,
            impact_bid_px: None,
            impact_ask_px: None,
        }
    }

    #[test]
    fn positions_value_at_the_matching_oracle_price() {
        let csv = b"time,BTC,ETH\nt0,2,-10\nt1,4,-10\n";
        let positions = decode_dynamic_csv(csv, "k").unwrap();
        let ctxs = vec![
            ctx("t0", "BTC", 100.0),
            ctx("t1", "BTC", 110.0),
            ctx("t0", "ETH", 10.0),
            ctx("t1", "ETH", 10.0),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &ctxs, &positions).unwrap();
        assert_eq!(set.len(), 2);
        // BTC: mean(2*100, 4*110) = 320
        assert_eq!(set.rows[0][0], SqlValue::Text("BTC".to_string()));
        assert_eq!(set.rows[0][1], SqlValue::Double(320.0));
        assert_eq!(set.rows[0][2], SqlValue::Double(320.0));
        // ETH short: ntl negative, ntl_abs positive
        assert_eq!(set.rows[1][1], SqlValue::Double(-100.0));
        assert_eq!(set.rows[1][2], SqlValue::Double(100.0));
    }

    #[test]
    fn samples_without_an_oracle_price_are_dropped() {
        let csv = b"time,BTC\nt0,2\nt1,4\n";
        let positions = decode_dynamic_csv(csv, "k").unwrap();
        let ctxs = vec![ctx("t0", "BTC", 100.0)];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &ctxs, &positions).unwrap();
        assert_eq!(set.rows[0][1], SqlValue::Double(200.0));
    }

    #[test]
    fn missing_time_column_is_an_error() {
        let csv = b"BTC\n2\n";
        let positions = decode_dynamic_csv(csv, "k").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(aggregate(date, &[], &positions).is_err());
    }
}
