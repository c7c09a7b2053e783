//! Trades aggregation: per-date volume statistics by trading group.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::models::TradeRow;

/// Time-in-force stamped on forced liquidation fills.
const LIQUIDATION_TIF: &str = "LiquidationMarket";

/// Sentinel for partitions predating the `tif` column.
const TIF_DEFAULT: &str = "Gtc";
/// Sentinel for rows with an empty value in a present `tif` column.
const TIF_MISSING: &str = "Na";

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::Trades.cache_table(),
        vec![
            Column::new("user", ColumnType::Text),
            Column::new("coin", ColumnType::Text),
            Column::new("side", ColumnType::Text),
            Column::new("crossed", ColumnType::Bool),
            Column::new("special_trade_type", ColumnType::Text),
            Column::new("tif", ColumnType::Text),
            Column::new("mean_px", ColumnType::Double),
            Column::new("sum_sz", ColumnType::Double),
            Column::new("group_count", ColumnType::BigInt),
            Column::new("time", ColumnType::Date),
            Column::new("usd_volume", ColumnType::Double),
            Column::new("liquidated_volume", ColumnType::Double),
        ],
    )
}

#[derive(Default)]
struct Acc {
    px_sum: f64,
    sz_sum: f64,
    count: u64,
}

type GroupKey = (String, String, String, bool, String, String);

/// Groups one date's trades by (user, coin, side, crossed,
/// special_trade_type, tif) and reduces to mean price, total size, row
/// count, and the derived USD volumes.
#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[TradeRow], has_tif_column: bool) -> RowSet {
    let mut groups: BTreeMap<GroupKey, Acc> = BTreeMap::new();

    for row in rows {
        let tif = row.tif.clone().unwrap_or_else(|| {
            if has_tif_column { TIF_MISSING } else { TIF_DEFAULT }.to_string()
        });
        let key = (
            row.user.clone(),
            row.coin.clone(),
            row.side.clone(),
            row.crossed,
            row.special_trade_type.clone(),
            tif,
        );
        let acc = groups.entry(key).or_default();
        acc.px_sum += row.px;
        acc.sz_sum += row.sz;
        acc.count += 1;
    }

    let mut set = RowSet::new(cache_schema());
    for ((user, coin, side, crossed, special_trade_type, tif), acc) in groups {
        let mean_px = acc.px_sum / acc.count as f64;
        let usd_volume = mean_px * acc.sz_sum;
        let liquidated_volume = if tif == LIQUIDATION_TIF { usd_volume } else { 0.0 };
        set.push(vec![
            SqlValue::Text(user),
            SqlValue::Text(coin),
            SqlValue::Text(side),
            SqlValue::Bool(crossed),
            SqlValue::Text(special_trade_type),
            SqlValue::Text(tif),
            SqlValue::Double(mean_px),
            SqlValue::Double(acc.sz_sum),
            SqlValue::BigInt(acc.count as i64),
            SqlValue::Date(date),
            SqlValue::Double(usd_volume),
            SqlValue::Double(liquidated_volume),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(user: &str, coin: &str, px: f64, sz: f64, tif: Option<&str>) -> TradeRow {
        TradeRow {
            time: "t".to_string(),
            user: user.to_string(),
            coin: coin.to_string(),
            side: "B".to_string(),
            crossed: true,
            special_trade_type: "na".to_string(),
            px,
            sz,
            tif: tif.map(str::to_string),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    #[test]
    fn matching_rows_reduce_to_one_group() {
        let rows = vec![
            trade("A", "X", 10.0, 2.0, Some("Gtc")),
            trade("A", "X", 20.0, 2.0, Some("Gtc")),
        ];
        let set = aggregate(date(), &rows, true);
        assert_eq!(set.len(), 1);
        let row = &set.rows[0];
        assert_eq!(row[6], SqlValue::Double(15.0)); // mean_px
        assert_eq!(row[7], SqlValue::Double(4.0)); // sum_sz
        assert_eq!(row[8], SqlValue::BigInt(2)); // group_count
        assert_eq!(row[10], SqlValue::Double(60.0)); // usd_volume
        assert_eq!(row[11], SqlValue::Double(0.0)); // liquidated_volume
    }

    #[test]
    fn differing_tif_splits_groups() {
        let rows = vec![
            trade("A", "X", 10.0, 1.0, Some("Gtc")),
            trade("A", "X", 10.0, 1.0, Some("Ioc")),
        ];
        let set = aggregate(date(), &rows, true);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn liquidation_tif_fills_liquidated_volume() {
        let rows = vec![trade("A", "X", 100.0, 2.0, Some("LiquidationMarket"))];
        let set = aggregate(date(), &rows, true);
        assert_eq!(set.rows[0][11], SqlValue::Double(200.0));
    }

    #[test]
    fn absent_tif_column_defaults_to_gtc() {
        let rows = vec![trade("A", "X", 10.0, 1.0, None)];
        let set = aggregate(date(), &rows, false);
        assert_eq!(set.rows[0][5], SqlValue::Text("Gtc".to_string()));
    }

    #[test]
    fn empty_tif_value_becomes_na() {
        let rows = vec![trade("A", "X", 10.0, 1.0, None)];
        let set = aggregate(date(), &rows, true);
        assert_eq!(set.rows[0][5], SqlValue::Text("Na".to_string()));
    }

    #[test]
    fn reaggregation_is_deterministic() {
        let rows = vec![
            trade("B", "Y", 10.0, 1.0, Some("Gtc")),
            trade("A", "X", 20.0, 1.0, Some("Gtc")),
            trade("B", "X", 30.0, 1.0, Some("Gtc")),
        ];
        let first = aggregate(date(), &rows, true);
        let second = aggregate(date(), &rows, true);
        assert_eq!(first.rows, second.rows);
    }
}
