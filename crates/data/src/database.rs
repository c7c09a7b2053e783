use anyhow::Result;
use chrono::NaiveDate;
use hl_stats_core::{Column, ColumnType};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Database client for the base and cache tables.
///
/// Tables are created lazily on first write, so every read helper tolerates
/// a table that does not exist yet.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Creates a new database client connected to the specified `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Wraps an existing pool, mainly for wiring in tests.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Whether a table exists in the public schema.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            ",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Maximum value of a date column, or `None` when the table is missing
    /// or empty.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn max_date(&self, table: &str, column: &str) -> Result<Option<NaiveDate>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }

        let max: Option<NaiveDate> =
            sqlx::query_scalar(&format!("SELECT max(\"{column}\") FROM \"{table}\""))
                .fetch_one(&self.pool)
                .await?;

        Ok(max)
    }

    /// Whether any row exists for the given date.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn date_exists(&self, table: &str, column: &str, date: NaiveDate) -> Result<bool> {
        if !self.table_exists(table).await? {
            return Ok(false);
        }

        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM \"{table}\" WHERE \"{column}\" = $1)"
        ))
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Stored column names of a table in ordinal order. Empty when the
    /// table does not exist.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn stored_columns(&self, table: &str) -> Result<Vec<String>> {
        let columns: Vec<String> = sqlx::query_scalar(
            r"
            SELECT column_name FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            ",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(columns)
    }

    /// Stored columns with their types, in ordinal order. Empty when the
    /// table does not exist.
    ///
    /// # Errors
    /// Returns an error if the database query fails.
    pub async fn stored_schema(&self, table: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r"
            SELECT column_name, data_type FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = $1
            ORDER BY ordinal_position
            ",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, ty)| Column::new(name, column_type_from_sql(&ty)))
            .collect())
    }

    /// Drops a table. Used when a source's cache is empty and its stale
    /// base table must be rebuilt from the seeded lookback window.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS \"{table}\""))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Maps an `information_schema.data_type` back onto the column types the
/// pipeline writes. Everything else degrades to `TEXT`.
pub(crate) fn column_type_from_sql(data_type: &str) -> ColumnType {
    match data_type {
        "date" => ColumnType::Date,
        "double precision" | "real" | "numeric" => ColumnType::Double,
        "boolean" => ColumnType::Bool,
        "bigint" | "integer" | "smallint" => ColumnType::BigInt,
        _ => ColumnType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_mapping_covers_the_written_types() {
        assert_eq!(column_type_from_sql("date"), ColumnType::Date);
        assert_eq!(column_type_from_sql("double precision"), ColumnType::Double);
        assert_eq!(column_type_from_sql("boolean"), ColumnType::Bool);
        assert_eq!(column_type_from_sql("bigint"), ColumnType::BigInt);
        assert_eq!(column_type_from_sql("text"), ColumnType::Text);
        assert_eq!(column_type_from_sql("jsonb"), ColumnType::Text);
    }
}
