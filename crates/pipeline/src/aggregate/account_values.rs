//! Account-values aggregation: end-of-day snapshot per (user, is_vault).
//!
//! The dump carries periodic samples of monotone cumulative counters, so
//! the last sample in file order is the day's closing value.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::models::AccountValueRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::AccountValues.cache_table(),
        vec![
            Column::new("user", ColumnType::Text),
            Column::new("is_vault", ColumnType::Bool),
            Column::new("last_account_value", ColumnType::Double),
            Column::new("last_cum_vlm", ColumnType::Double),
            Column::new("last_cum_ledger", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

struct Last {
    account_value: f64,
    cum_vlm: f64,
    cum_ledger: f64,
}

#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[AccountValueRow]) -> RowSet {
    let mut last: BTreeMap<(String, bool), Last> = BTreeMap::new();
    for row in rows {
        last.insert(
            (row.user.clone(), row.is_vault),
            Last {
                account_value: row.account_value,
                cum_vlm: row.cum_vlm,
                cum_ledger: row.cum_ledger,
            },
        );
    }

    let mut set = RowSet::new(cache_schema());
    for ((user, is_vault), values) in last {
        set.push(vec![
            SqlValue::Text(user),
            SqlValue::Bool(is_vault),
            SqlValue::Double(values.account_value),
            SqlValue::Double(values.cum_vlm),
            SqlValue::Double(values.cum_ledger),
            SqlValue::Date(date),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: &str, is_vault: bool, account_value: f64, cum_vlm: f64) -> AccountValueRow {
        AccountValueRow {
            time: "t".to_string(),
            user: user.to_string(),
            is_vault,
            account_value,
            cum_vlm,
            cum_ledger: 0.0,
        }
    }

    #[test]
    fn later_samples_replace_earlier_ones() {
        let rows = vec![
            row("0xa", false, 100.0, 10.0),
            row("0xa", false, 150.0, 20.0),
        ];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &rows);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rows[0][2], SqlValue::Double(150.0));
        assert_eq!(set.rows[0][3], SqlValue::Double(20.0));
    }

    #[test]
    fn vault_flag_splits_groups() {
        let rows = vec![row("0xa", false, 100.0, 0.0), row("0xa", true, 5.0, 0.0)];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &rows);
        assert_eq!(set.len(), 2);
    }
}
