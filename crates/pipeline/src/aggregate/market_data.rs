//! Market-data cache rows from the per-day order-book reduction.

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, Source, TableSchema};

use crate::slippage::{DayBookAggregate, TIER_COLUMNS};

#[must_use]
pub fn cache_schema() -> TableSchema {
    let mut columns = vec![
        Column::new("time", ColumnType::Date),
        Column::new("coin", ColumnType::Text),
        Column::new("median_liquidity", ColumnType::Double),
    ];
    columns.extend(
        TIER_COLUMNS
            .iter()
            .map(|name| Column::new(*name, ColumnType::Double)),
    );
    columns.push(Column::new("mid_price", ColumnType::Double));
    TableSchema::new(Source::MarketData.cache_table(), columns)
}

#[must_use]
pub fn rows(date: NaiveDate, aggregates: &[DayBookAggregate]) -> RowSet {
    let mut set = RowSet::new(cache_schema());
    for agg in aggregates {
        let mut values = vec![
            SqlValue::Date(date),
            SqlValue::Text(agg.coin.clone()),
            SqlValue::Double(agg.median_liquidity),
        ];
        values.extend(agg.median_slippage.iter().map(|s| SqlValue::Double(*s)));
        values.push(SqlValue::Double(agg.mean_mid));
        set.push(values);
    }
    set
}
