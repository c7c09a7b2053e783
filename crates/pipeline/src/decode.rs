//! Partition decompression and decoding.
//!
//! Partitions arrive LZ4-frame compressed. Scalar sources decode into typed
//! rows via serde; the passthrough sources keep their partition-dependent
//! column sets and decode into a dynamic table. Market-data shards are
//! newline-delimited JSON, one L2 snapshot per line.

use anyhow::Result;
use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, PipelineError, RowSet, SqlValue, TableSchema};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;

use crate::models::{BookLevel, OrderBookSnapshot};

/// Decompresses an LZ4-frame payload. `key` only labels errors.
pub fn decompress_lz4(data: &[u8], key: &str) -> Result<Vec<u8>> {
    let mut decoder = lz4_flex::frame::FrameDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| PipelineError::decode(key, e))?;
    Ok(out)
}

/// A decoded CSV partition: the typed rows plus the header names actually
/// present, so callers can tell an absent optional column from an empty one.
#[derive(Debug, Clone)]
pub struct CsvPartition<T> {
    pub headers: Vec<String>,
    pub rows: Vec<T>,
}

impl<T> CsvPartition<T> {
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Decodes a CSV partition into typed rows.
pub fn decode_csv<T: DeserializeOwned>(data: &[u8], key: &str) -> Result<CsvPartition<T>> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| PipelineError::decode(key, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T = record.map_err(|e| PipelineError::decode(key, e))?;
        rows.push(row);
    }

    Ok(CsvPartition { headers, rows })
}

/// A CSV partition whose column set is only known at decode time
/// (per-coin position columns, evolving fee columns).
#[derive(Debug, Clone)]
pub struct DynamicTable {
    pub headers: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl DynamicTable {
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    #[must_use]
    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        match self.rows.get(row)?.get(col)? {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Cell rendered as a join key. Numeric cells print in their shortest
    /// form, so an epoch-millis `time` column matches the same value read
    /// from a typed CSV as text.
    #[must_use]
    pub fn key_text(&self, row: usize, col: usize) -> Option<String> {
        match self.rows.get(row)?.get(col)? {
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Double(f) => Some(f.to_string()),
            SqlValue::BigInt(i) => Some(i.to_string()),
            SqlValue::Bool(_) | SqlValue::Date(_) | SqlValue::Null => None,
        }
    }

    #[must_use]
    pub fn double(&self, row: usize, col: usize) -> Option<f64> {
        match self.rows.get(row)?.get(col)? {
            SqlValue::Double(f) => Some(*f),
            SqlValue::BigInt(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Base-table row set: leading `day` partition column, then the
    /// partition's own columns verbatim.
    #[must_use]
    pub fn to_base_rowset(&self, table: &str, day: NaiveDate) -> RowSet {
        let mut columns = vec![Column::new("day", ColumnType::Date)];
        columns.extend(
            self.headers
                .iter()
                .zip(&self.types)
                .map(|(name, ty)| Column::new(name.clone(), *ty)),
        );
        let mut set = RowSet::new(TableSchema::new(table, columns));
        for row in &self.rows {
            let mut values = Vec::with_capacity(row.len() + 1);
            values.push(SqlValue::Date(day));
            values.extend(row.iter().cloned());
            set.push(values);
        }
        set
    }

    /// Cache row set for the passthrough source: identity columns stamped
    /// with the partition date as `time` (replacing any dump-supplied
    /// `time` column).
    #[must_use]
    pub fn to_cache_rowset(&self, table: &str, date: NaiveDate) -> RowSet {
        let kept: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() != "time")
            .map(|(i, _)| i)
            .collect();

        let mut columns = vec![Column::new("time", ColumnType::Date)];
        columns.extend(
            kept.iter()
                .map(|&i| Column::new(self.headers[i].clone(), self.types[i])),
        );
        let mut set = RowSet::new(TableSchema::new(table, columns));
        for row in &self.rows {
            let mut values = Vec::with_capacity(kept.len() + 1);
            values.push(SqlValue::Date(date));
            values.extend(kept.iter().map(|&i| row[i].clone()));
            set.push(values);
        }
        set
    }
}

fn parse_cell(raw: &str) -> SqlValue {
    if raw.is_empty() {
        return SqlValue::Null;
    }
    if let Ok(f) = raw.parse::<f64>() {
        return SqlValue::Double(f);
    }
    match raw {
        "true" | "True" | "TRUE" => SqlValue::Bool(true),
        "false" | "False" | "FALSE" => SqlValue::Bool(false),
        _ => SqlValue::Text(raw.to_string()),
    }
}

fn cell_type(value: &SqlValue) -> Option<ColumnType> {
    match value {
        SqlValue::Double(_) => Some(ColumnType::Double),
        SqlValue::Bool(_) => Some(ColumnType::Bool),
        SqlValue::Text(_) => Some(ColumnType::Text),
        SqlValue::BigInt(_) => Some(ColumnType::BigInt),
        SqlValue::Date(_) => Some(ColumnType::Date),
        SqlValue::Null => None,
    }
}

/// Decodes a CSV partition without a fixed schema. Cell values are typed by
/// content; each column takes the type of its first non-null cell, `TEXT`
/// when the column is entirely empty.
pub fn decode_dynamic_csv(data: &[u8], key: &str) -> Result<DynamicTable> {
    let mut reader = csv::Reader::from_reader(data);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::decode(key, e))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::decode(key, e))?;
        if record.len() != headers.len() {
            return Err(PipelineError::decode(
                key,
                format!(
                    "row has {} fields, header has {}",
                    record.len(),
                    headers.len()
                ),
            )
            .into());
        }
        rows.push(record.iter().map(parse_cell).collect::<Vec<_>>());
    }

    let types = (0..headers.len())
        .map(|col| {
            rows.iter()
                .find_map(|row| cell_type(&row[col]))
                .unwrap_or(ColumnType::Text)
        })
        .collect();

    Ok(DynamicTable {
        headers,
        types,
        rows,
    })
}

#[derive(Debug, Deserialize)]
struct L2Line {
    raw: L2Raw,
}

#[derive(Debug, Deserialize)]
struct L2Raw {
    data: L2Data,
}

#[derive(Debug, Deserialize)]
struct L2Data {
    coin: String,
    levels: Vec<Vec<L2Level>>,
}

#[derive(Debug, Deserialize)]
struct L2Level {
    px: String,
    sz: String,
}

fn parse_ladder(levels: &[L2Level], key: &str) -> Result<Vec<BookLevel>> {
    levels
        .iter()
        .map(|level| {
            let px = level
                .px
                .parse::<f64>()
                .map_err(|e| PipelineError::decode(key, format!("bad px {}: {e}", level.px)))?;
            let sz = level
                .sz
                .parse::<f64>()
                .map_err(|e| PipelineError::decode(key, format!("bad sz {}: {e}", level.sz)))?;
            Ok(BookLevel { px, sz })
        })
        .collect()
}

/// Decodes a market-data shard: one JSON object per line, each holding one
/// L2 snapshot with `levels = [bids, asks]`.
pub fn decode_l2_shard(data: &[u8], key: &str) -> Result<Vec<OrderBookSnapshot>> {
    let text = std::str::from_utf8(data).map_err(|e| PipelineError::decode(key, e))?;
    let mut snapshots = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: L2Line =
            serde_json::from_str(line).map_err(|e| PipelineError::decode(key, e))?;
        let mut ladders = parsed.raw.data.levels;
        if ladders.len() != 2 {
            return Err(PipelineError::decode(
                key,
                format!("expected [bids, asks], got {} ladders", ladders.len()),
            )
            .into());
        }
        let asks = parse_ladder(&ladders.pop().unwrap_or_default(), key)?;
        let bids = parse_ladder(&ladders.pop().unwrap_or_default(), key)?;
        snapshots.push(OrderBookSnapshot {
            coin: parsed.raw.data.coin,
            bids,
            asks,
        });
    }
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeRow;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn lz4_roundtrip() {
        let payload = b"time,user\n1,a\n";
        let decoded = decompress_lz4(&compress(payload), "k").unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn corrupt_lz4_is_a_decode_error() {
        let err = decompress_lz4(b"not lz4 at all", "trades/x.csv.lz4").unwrap_err();
        assert!(err.to_string().contains("trades/x.csv.lz4"));
    }

    #[test]
    fn typed_csv_reports_header_presence() {
        let csv = b"time,user,coin,side,crossed,special_trade_type,px,sz\n\
                    t0,0xa,BTC,B,True,na,10.0,2.0\n";
        let part: CsvPartition<TradeRow> = decode_csv(csv, "k").unwrap();
        assert!(!part.has_column("tif"));
        assert_eq!(part.rows.len(), 1);
        assert!(part.rows[0].crossed);
        assert_eq!(part.rows[0].tif, None);
    }

    #[test]
    fn dynamic_csv_types_columns_by_content() {
        let csv = b"time,BTC,label\n2024-05-10 00:00:00,1.5,x\n2024-05-10 01:00:00,,y\n";
        let table = decode_dynamic_csv(csv, "k").unwrap();
        assert_eq!(
            table.types,
            vec![ColumnType::Text, ColumnType::Double, ColumnType::Text]
        );
        assert_eq!(table.rows[1][1], SqlValue::Null);
    }

    #[test]
    fn dynamic_cache_rowset_replaces_time_with_partition_date() {
        let csv = b"time,total_accrued_fees\n2024-05-10 00:00:00,12.5\n";
        let table = decode_dynamic_csv(csv, "k").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let set = table.to_cache_rowset("total_accrued_fees_cache", date);
        assert_eq!(set.schema.column_names(), vec!["time", "total_accrued_fees"]);
        assert_eq!(set.rows[0][0], SqlValue::Date(date));
        assert_eq!(set.rows[0][1], SqlValue::Double(12.5));
    }

    #[test]
    fn l2_shard_decodes_both_ladders() {
        let line = r#"{"time":"2024-05-10T00:00:00","ver_num":1,"raw":{"channel":"l2Book","data":{"coin":"BTC","time":1715299200000,"levels":[[{"px":"99.0","sz":"1.0","n":2}],[{"px":"101.0","sz":"2.0","n":1}]]}}}"#;
        let snapshots = decode_l2_shard(line.as_bytes(), "k").unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].coin, "BTC");
        assert_eq!(snapshots[0].bids, vec![BookLevel { px: 99.0, sz: 1.0 }]);
        assert_eq!(snapshots[0].asks, vec![BookLevel { px: 101.0, sz: 2.0 }]);
    }

    #[test]
    fn truncated_l2_line_is_a_decode_error() {
        let err = decode_l2_shard(br#"{"raw":{"data":{"coin":"BTC""#, "k").unwrap_err();
        assert!(err.to_string().contains("decode failed"));
    }
}
