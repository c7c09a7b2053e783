//! Shared partition-replace machinery for base and cache tables.
//!
//! Both table tiers follow the same write discipline: create the table on
//! first use, detect schema drift against the stored column set, then
//! delete-and-insert the partition inside one transaction. Drift triggers a
//! deterministic full-table rewrite onto the union of the expected and
//! stored column sets, so history in columns the current partition no
//! longer carries survives.

use anyhow::Result;
use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType, PipelineError, RowSet, SqlValue, TableSchema};
use sqlx::{Postgres, QueryBuilder};

use crate::database::DatabaseClient;

const INSERT_CHUNK: usize = 100;

pub(crate) struct TableWriter<'a> {
    db: &'a DatabaseClient,
}

impl<'a> TableWriter<'a> {
    pub(crate) fn new(db: &'a DatabaseClient) -> Self {
        Self { db }
    }

    /// Replaces the partition identified by `date` in `key_column` with the
    /// given rows. Reprocessing a date through here leaves the table in the
    /// same state as the first processing.
    pub(crate) async fn replace_partition(
        &self,
        rows: &RowSet,
        key_column: &str,
        date: NaiveDate,
    ) -> Result<()> {
        let schema = &rows.schema;
        let table = schema.table.as_str();

        sqlx::query(&schema.create_table_sql())
            .execute(self.db.pool())
            .await?;

        let stored = self.db.stored_columns(table).await?;
        let expected = schema.column_names();
        if !same_column_set(&expected, &stored) {
            tracing::warn!(
                table,
                stored = ?stored,
                expected = ?expected,
                "stored columns diverge from expected schema, rewriting table"
            );
            if let Err(e) = self.rewrite(schema).await {
                tracing::error!(table, "schema rewrite fallback failed: {e:#}");
                return Err(PipelineError::schema_drift(table, &expected, &stored).into());
            }
        }

        let mut tx = self.db.pool().begin().await?;

        sqlx::query(&format!(
            "DELETE FROM \"{table}\" WHERE \"{key_column}\" = $1"
        ))
        .bind(date)
        .execute(&mut *tx)
        .await?;

        for chunk in rows.rows.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix(schema));
            builder.push_values(chunk, |mut b, row| {
                for (value, column) in row.iter().zip(&schema.columns) {
                    bind_value(&mut b, value, column.ty);
                }
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Full-table rewrite on schema drift: build a sibling table with the
    /// union of the expected and stored columns, copy every stored column
    /// over, and swap it in. Columns only one side has are NULL-filled.
    /// O(table size), only exercised when upstream columns change.
    async fn rewrite(&self, schema: &TableSchema) -> Result<()> {
        let table = schema.table.as_str();
        let stored = self.db.stored_schema(table).await?;
        let staging = TableSchema::new(
            format!("{table}__rewrite"),
            rewrite_columns(&schema.columns, &stored),
        );
        let copied: Vec<String> = stored
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect();

        let mut tx = self.db.pool().begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS \"{}\"", staging.table))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&staging.create_table_sql())
            .execute(&mut *tx)
            .await?;
        if !copied.is_empty() {
            let column_list = copied.join(", ");
            sqlx::query(&format!(
                "INSERT INTO \"{}\" ({column_list}) SELECT {column_list} FROM \"{table}\"",
                staging.table
            ))
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(&format!("DROP TABLE \"{table}\""))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "ALTER TABLE \"{}\" RENAME TO \"{table}\"",
            staging.table
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn insert_prefix(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("\"{}\"", c.name))
        .collect();
    format!(
        "INSERT INTO \"{}\" ({}) ",
        schema.table,
        columns.join(", ")
    )
}

/// Column set for the drift rewrite: the expected schema first, then any
/// stored-only columns with their introspected types. The union matters —
/// a column the current partition no longer carries still holds every
/// earlier date's data.
fn rewrite_columns(expected: &[Column], stored: &[Column]) -> Vec<Column> {
    let mut columns = expected.to_vec();
    for column in stored {
        if !expected.iter().any(|c| c.name == column.name) {
            columns.push(column.clone());
        }
    }
    columns
}

fn same_column_set(expected: &[&str], stored: &[String]) -> bool {
    expected.len() == stored.len()
        && expected.iter().all(|e| stored.iter().any(|s| s == e))
}

fn bind_value(
    b: &mut sqlx::query_builder::Separated<'_, '_, Postgres, &str>,
    value: &SqlValue,
    ty: ColumnType,
) {
    match value {
        SqlValue::Date(d) => {
            b.push_bind(*d);
        }
        SqlValue::Text(s) => {
            b.push_bind(s.clone());
        }
        SqlValue::Double(f) => {
            b.push_bind(*f);
        }
        SqlValue::Bool(v) => {
            b.push_bind(*v);
        }
        SqlValue::BigInt(i) => {
            b.push_bind(*i);
        }
        SqlValue::Null => match ty {
            ColumnType::Date => {
                b.push_bind(None::<NaiveDate>);
            }
            ColumnType::Text => {
                b.push_bind(None::<String>);
            }
            ColumnType::Double => {
                b.push_bind(None::<f64>);
            }
            ColumnType::Bool => {
                b.push_bind(None::<bool>);
            }
            ColumnType::BigInt => {
                b.push_bind(None::<i64>);
            }
        },
    }
}
