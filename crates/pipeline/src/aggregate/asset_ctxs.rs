//! Asset-contexts aggregation: per-coin daily market statistics.
//!
//! `avg_day_ntl_vlm` keeps its historical column name but holds the last
//! sample of the day: the dump's `day_ntl_vlm` is already a daily running
//! total, so its final reading is the day's volume.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use super::mean_opt;
use crate::models::AssetCtxRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::AssetCtxs.cache_table(),
        vec![
            Column::new("coin", ColumnType::Text),
            Column::new("sum_funding", ColumnType::Double),
            Column::new("avg_open_interest", ColumnType::Double),
            Column::new("avg_prev_day_px", ColumnType::Double),
            Column::new("avg_day_ntl_vlm", ColumnType::Double),
            Column::new("avg_premium", ColumnType::Double),
            Column::new("avg_oracle_px", ColumnType::Double),
            Column::new("first_oracle_px", ColumnType::Double),
            Column::new("last_oracle_px", ColumnType::Double),
            Column::new("avg_mark_px", ColumnType::Double),
            Column::new("avg_mid_px", ColumnType::Double),
            Column::new("avg_impact_bid_px", ColumnType::Double),
            Column::new("avg_impact_ask_px", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

fn opt(value: Option<f64>) -> SqlValue {
    value.map_or(SqlValue::Null, SqlValue::Double)
}

#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[AssetCtxRow]) -> RowSet {
    let mut by_coin: BTreeMap<String, Vec<&AssetCtxRow>> = BTreeMap::new();
    for row in rows {
        by_coin.entry(row.coin.clone()).or_default().push(row);
    }

    let mut set = RowSet::new(cache_schema());
    for (coin, group) in by_coin {
        let n = group.len() as f64;
        let mean = |f: fn(&AssetCtxRow) -> f64| group.iter().map(|r| f(r)).sum::<f64>() / n;

        set.push(vec![
            SqlValue::Text(coin),
            SqlValue::Double(group.iter().map(|r| r.funding).sum()),
            SqlValue::Double(mean(|r| r.open_interest)),
            SqlValue::Double(mean(|r| r.prev_day_px)),
            SqlValue::Double(group.last().map(|r| r.day_ntl_vlm).unwrap_or_default()),
            opt(mean_opt(group.iter().map(|r| r.premium))),
            SqlValue::Double(mean(|r| r.oracle_px)),
            SqlValue::Double(group.first().map(|r| r.oracle_px).unwrap_or_default()),
            SqlValue::Double(group.last().map(|r| r.oracle_px).unwrap_or_default()),
            SqlValue::Double(mean(|r| r.mark_px)),
            opt(mean_opt(group.iter().map(|r| r.mid_px))),
            opt(mean_opt(group.iter().map(|r| r.impact_bid_px))),
            opt(mean_opt(group.iter().map(|r| r.impact_ask_px))),
            SqlValue::Date(date),
        ]);
    }
    set
}
