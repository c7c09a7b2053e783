//! Relational table descriptions and dynamically typed row sets.
//!
//! Cache schemas are fixed per source, but two passthrough sources carry
//! partition-dependent columns (per-coin position sizes, evolving fee
//! columns), and the schema-drift fallback has to reason about column sets
//! explicitly. Loader, aggregators, and writer therefore share this small
//! value-level representation instead of per-table record structs.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Date,
    Text,
    Double,
    Bool,
    BigInt,
}

impl ColumnType {
    #[must_use]
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Date => "DATE",
            ColumnType::Text => "TEXT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Bool => "BOOLEAN",
            ColumnType::BigInt => "BIGINT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A table name plus its ordered column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table: String,
    pub columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(table: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Renders the bootstrap DDL for this table.
    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("\"{}\" {}", c.name, c.ty.sql_type()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.table,
            cols.join(", ")
        )
    }
}

/// One cell of a row, matching the column types above.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Date(NaiveDate),
    Text(String),
    Double(f64),
    Bool(bool),
    BigInt(i64),
    Null,
}

/// An ordered set of rows bound to one schema.
#[derive(Debug, Clone)]
pub struct RowSet {
    pub schema: TableSchema,
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    #[must_use]
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<SqlValue>) {
        debug_assert_eq!(row.len(), self.schema.columns.len());
        self.rows.push(row);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_sql_renders_all_columns() {
        let schema = TableSchema::new(
            "funding_cache",
            vec![
                Column::new("time", ColumnType::Date),
                Column::new("coin", ColumnType::Text),
                Column::new("sum_funding", ColumnType::Double),
            ],
        );
        assert_eq!(
            schema.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS \"funding_cache\" \
             (\"time\" DATE, \"coin\" TEXT, \"sum_funding\" DOUBLE PRECISION)"
        );
    }

    #[test]
    fn column_names_preserve_order() {
        let schema = TableSchema::new(
            "t",
            vec![
                Column::new("b", ColumnType::Text),
                Column::new("a", ColumnType::Double),
            ],
        );
        assert_eq!(schema.column_names(), vec!["b", "a"]);
    }
}
