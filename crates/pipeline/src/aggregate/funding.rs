//! Funding aggregation: per-coin funding and premium totals.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::models::FundingRow;

#[must_use]
pub fn cache_schema() -> TableSchema {
    TableSchema::new(
        Source::Funding.cache_table(),
        vec![
            Column::new("coin", ColumnType::Text),
            Column::new("sum_funding", ColumnType::Double),
            Column::new("sum_premium", ColumnType::Double),
            Column::new("time", ColumnType::Date),
        ],
    )
}

#[derive(Default)]
struct Acc {
    funding: f64,
    premium: f64,
}

#[must_use]
pub fn aggregate(date: NaiveDate, rows: &[FundingRow]) -> RowSet {
    let mut groups: BTreeMap<String, Acc> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(row.coin.clone()).or_default();
        acc.funding += row.funding;
        acc.premium += row.premium;
    }

    let mut set = RowSet::new(cache_schema());
    for (coin, acc) in groups {
        set.push(vec![
            SqlValue::Text(coin),
            SqlValue::Double(acc.funding),
            SqlValue::Double(acc.premium),
            SqlValue::Date(date),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hourly_samples_sum_per_coin() {
        let rows = vec![
            FundingRow {
                time: "t0".to_string(),
                coin: "BTC".to_string(),
                funding: 0.0001,
                premium: 0.001,
            },
            FundingRow {
                time: "t1".to_string(),
                coin: "BTC".to_string(),
                funding: 0.0002,
                premium: -0.002,
            },
        ];
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = aggregate(date, &rows);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rows[0][1], SqlValue::Double(0.0001 + 0.0002));
        assert_eq!(set.rows[0][2], SqlValue::Double(0.001 - 0.002));
    }
}
