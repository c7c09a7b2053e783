//! Typed raw-row models for the scalar sources, and the decoded order-book
//! snapshot used by the slippage engine.
//!
//! Each scalar source's CSV partition decodes into one of these structs;
//! `*_base_rowset` builds the base-table row set (a leading `day` partition
//! column followed by the dump's own columns).

use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, RowSet, SqlValue, TableSchema};
use serde::{Deserialize, Deserializer};
use hl_stats_core::Source;

/// Accepts pythonic capitalized booleans alongside the usual forms.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "true" | "True" | "TRUE" | "1" => Ok(true),
        "false" | "False" | "FALSE" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid boolean: {other}"
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRow {
    pub time: String,
    pub user: String,
    pub coin: String,
    pub side: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub crossed: bool,
    pub special_trade_type: String,
    pub px: f64,
    pub sz: f64,
    /// Absent in older partitions; the aggregator fills the sentinel.
    #[serde(default)]
    pub tif: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerUpdateRow {
    pub time: String,
    pub user: String,
    pub delta_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiquidationRow {
    pub time: String,
    pub user: String,
    pub leverage_type: String,
    pub liquidated_ntl_pos: f64,
    pub liquidated_account_value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FundingRow {
    pub time: String,
    pub coin: String,
    pub funding: f64,
    pub premium: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountValueRow {
    pub time: String,
    pub user: String,
    #[serde(deserialize_with = "flexible_bool")]
    pub is_vault: bool,
    pub account_value: f64,
    pub cum_vlm: f64,
    pub cum_ledger: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetCtxRow {
    pub time: String,
    pub coin: String,
    pub funding: f64,
    pub open_interest: f64,
    pub prev_day_px: f64,
    pub day_ntl_vlm: f64,
    #[serde(default)]
    pub premium: Option<f64>,
    pub oracle_px: f64,
    pub mark_px: f64,
    #[serde(default)]
    pub mid_px: Option<f64>,
    #[serde(default)]
    pub impact_bid_px: Option<f64>,
    #[serde(default)]
    pub impact_ask_px: Option<f64>,
}

/// One price level of an order-book ladder.
#[derive(Debug, Clone, PartialEq)]
pub struct BookLevel {
    pub px: f64,
    pub sz: f64,
}

/// A decoded L2 snapshot: the level ladders are parsed once, not re-read
/// per notional tier.
#[derive(Debug, Clone)]
pub struct OrderBookSnapshot {
    pub coin: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

fn day_column() -> Column {
    Column::new("day", ColumnType::Date)
}

#[must_use]
pub fn trades_base_schema() -> TableSchema {
    TableSchema::new(
        Source::Trades.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("user", ColumnType::Text),
            Column::new("coin", ColumnType::Text),
            Column::new("side", ColumnType::Text),
            Column::new("crossed", ColumnType::Bool),
            Column::new("special_trade_type", ColumnType::Text),
            Column::new("px", ColumnType::Double),
            Column::new("sz", ColumnType::Double),
            Column::new("tif", ColumnType::Text),
        ],
    )
}

#[must_use]
pub fn trades_base_rowset(day: NaiveDate, rows: &[TradeRow]) -> RowSet {
    let mut set = RowSet::new(trades_base_schema());
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.user.clone()),
            SqlValue::Text(row.coin.clone()),
            SqlValue::Text(row.side.clone()),
            SqlValue::Bool(row.crossed),
            SqlValue::Text(row.special_trade_type.clone()),
            SqlValue::Double(row.px),
            SqlValue::Double(row.sz),
            match &row.tif {
                Some(tif) => SqlValue::Text(tif.clone()),
                None => SqlValue::Null,
            },
        ]);
    }
    set
}

#[must_use]
pub fn ledger_base_rowset(day: NaiveDate, rows: &[LedgerUpdateRow]) -> RowSet {
    let schema = TableSchema::new(
        Source::LedgerUpdates.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("user", ColumnType::Text),
            Column::new("delta_usd", ColumnType::Double),
        ],
    );
    let mut set = RowSet::new(schema);
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.user.clone()),
            SqlValue::Double(row.delta_usd),
        ]);
    }
    set
}

#[must_use]
pub fn liquidations_base_rowset(day: NaiveDate, rows: &[LiquidationRow]) -> RowSet {
    let schema = TableSchema::new(
        Source::Liquidations.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("user", ColumnType::Text),
            Column::new("leverage_type", ColumnType::Text),
            Column::new("liquidated_ntl_pos", ColumnType::Double),
            Column::new("liquidated_account_value", ColumnType::Double),
        ],
    );
    let mut set = RowSet::new(schema);
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.user.clone()),
            SqlValue::Text(row.leverage_type.clone()),
            SqlValue::Double(row.liquidated_ntl_pos),
            SqlValue::Double(row.liquidated_account_value),
        ]);
    }
    set
}

#[must_use]
pub fn funding_base_rowset(day: NaiveDate, rows: &[FundingRow]) -> RowSet {
    let schema = TableSchema::new(
        Source::Funding.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("coin", ColumnType::Text),
            Column::new("funding", ColumnType::Double),
            Column::new("premium", ColumnType::Double),
        ],
    );
    let mut set = RowSet::new(schema);
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.coin.clone()),
            SqlValue::Double(row.funding),
            SqlValue::Double(row.premium),
        ]);
    }
    set
}

#[must_use]
pub fn account_values_base_rowset(day: NaiveDate, rows: &[AccountValueRow]) -> RowSet {
    let schema = TableSchema::new(
        Source::AccountValues.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("user", ColumnType::Text),
            Column::new("is_vault", ColumnType::Bool),
            Column::new("account_value", ColumnType::Double),
            Column::new("cum_vlm", ColumnType::Double),
            Column::new("cum_ledger", ColumnType::Double),
        ],
    );
    let mut set = RowSet::new(schema);
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.user.clone()),
            SqlValue::Bool(row.is_vault),
            SqlValue::Double(row.account_value),
            SqlValue::Double(row.cum_vlm),
            SqlValue::Double(row.cum_ledger),
        ]);
    }
    set
}

#[must_use]
pub fn asset_ctxs_base_rowset(day: NaiveDate, rows: &[AssetCtxRow]) -> RowSet {
    let schema = TableSchema::new(
        Source::AssetCtxs.name(),
        vec![
            day_column(),
            Column::new("time", ColumnType::Text),
            Column::new("coin", ColumnType::Text),
            Column::new("funding", ColumnType::Double),
            Column::new("open_interest", ColumnType::Double),
            Column::new("prev_day_px", ColumnType::Double),
            Column::new("day_ntl_vlm", ColumnType::Double),
            Column::new("premium", ColumnType::Double),
            Column::new("oracle_px", ColumnType::Double),
            Column::new("mark_px", ColumnType::Double),
            Column::new("mid_px", ColumnType::Double),
            Column::new("impact_bid_px", ColumnType::Double),
            Column::new("impact_ask_px", ColumnType::Double),
        ],
    );
    let opt = |v: Option<f64>| v.map_or(SqlValue::Null, SqlValue::Double);
    let mut set = RowSet::new(schema);
    for row in rows {
        set.push(vec![
            SqlValue::Date(day),
            SqlValue::Text(row.time.clone()),
            SqlValue::Text(row.coin.clone()),
            SqlValue::Double(row.funding),
            SqlValue::Double(row.open_interest),
            SqlValue::Double(row.prev_day_px),
            SqlValue::Double(row.day_ntl_vlm),
            opt(row.premium),
            SqlValue::Double(row.oracle_px),
            SqlValue::Double(row.mark_px),
            opt(row.mid_px),
            opt(row.impact_bid_px),
            opt(row.impact_ask_px),
        ]);
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn trades_base_rowset_leads_with_partition_day() {
        let rows = vec![TradeRow {
            time: "2024-05-10T00:00:01Z".to_string(),
            user: "0xabc".to_string(),
            coin: "BTC".to_string(),
            side: "B".to_string(),
            crossed: true,
            special_trade_type: "na".to_string(),
            px: 60000.0,
            sz: 0.5,
            tif: None,
        }];
        let set = trades_base_rowset(date(2024, 5, 10), &rows);
        assert_eq!(set.schema.table, "non_mm_trades");
        assert_eq!(set.schema.columns[0].name, "day");
        assert_eq!(set.rows[0][0], SqlValue::Date(date(2024, 5, 10)));
        assert_eq!(set.rows[0][9], SqlValue::Null);
    }
}
