//! Ledger-updates aggregation: per-user USD delta totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::models::LedgerUpdateRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::LedgerUpdates.cache_table(),
        vec![
            Column::new("user", ColumnType::Text),
            Column::new("sum_delta_usd", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[LedgerUpdateRow]) -> RowSet {
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        *sums.entry(row.user.clone()).or_default() += row.delta_usd;
    }

    let mut set = RowSet::new(cache_schema());
    for (user, sum_delta_usd) in sums {
        set.push(vec![
            SqlValue::Text(user),
            SqlValue::Double(sum_delta_usd),
            SqlValue::Date(date),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deposits_and_withdrawals_net_per_user() {
        let rows = vec![
            LedgerUpdateRow {
                time: "t0".to_string(),
                user: "0xa".to_string(),
                delta_usd: 100.0,
            },
            LedgerUpdateRow {
                time: "t1".to_string(),
                user: "0xa".to_string(),
                delta_usd: -40.0,
            },
            LedgerUpdateRow {
                time: "t2".to_string(),
                user: "0xb".to_string(),
                delta_usd: 7.5,
            },
        ];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &rows);
        assert_eq!(set.len(), 2);
        assert_eq!(set.rows[0][0], SqlValue::Text("0xa".to_string()));
        assert_eq!(set.rows[0][1], SqlValue::Double(60.0));
        assert_eq!(set.rows[0][2], SqlValue::Date(date));
        assert_eq!(set.rows[1][1], SqlValue::Double(7.5));
    }
}
