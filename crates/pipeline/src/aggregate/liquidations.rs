//! Liquidations aggregation: per-(user, leverage_type) notional totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::models::LiquidationRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::Liquidations.cache_table(),
        vec![
            Column::new("user", ColumnType::Text),
            Column::new("leverage_type", ColumnType::Text),
            Column::new("sum_liquidated_ntl_pos", ColumnType::Double),
            Column::new("sum_liquidated_account_value", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

#[derive(Default)]
struct Acc {
    ntl_pos: f64,
    account_value: f64,
}

#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[LiquidationRow]) -> RowSet {
    let mut groups: BTreeMap<(String, String), Acc> = BTreeMap::new();
    for row in rows {
        let acc = groups
            .entry((row.user.clone(), row.leverage_type.clone()))
            .or_default();
        acc.ntl_pos += row.liquidated_ntl_pos;
        acc.account_value += row.liquidated_account_value;
    }

    let mut set = RowSet::new(cache_schema());
    for ((user, leverage_type), acc) in groups {
        set.push(vec![
            SqlValue::Text(user),
            SqlValue::Text(leverage_type),
            SqlValue::Double(acc.ntl_pos),
            SqlValue::Double(acc.account_value),
            SqlValue::Date(date),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, leverage_type: &str, ntl: f64, av: f64) -> LiquidationRow {
        LiquidationRow {
            time: "t".to_string(),
            user: user.to_string(),
            leverage_type: leverage_type.to_string(),
            liquidated_ntl_pos: ntl,
            liquidated_account_value: av,
        }
    }

    #[test]
    fn totals_split_by_leverage_type() {
        let rows = vec![
            row("0xa", "Cross", 1000.0, 50.0),
            row("0xa", "Cross", 500.0, 25.0),
            row("0xa", "Isolated", 200.0, 10.0),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &rows);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows[0][1], SqlValue::Text("Cross".to_string()));
        assert_eq!(set.rows[0][2], SqlValue::Double(1500.0));
        assert_eq!(set.rows[0][3], SqlValue::Double(75.0));
        assert_eq!(set.rows[1][1], SqlValue::Text("Isolated".to_string()));
    }
}
