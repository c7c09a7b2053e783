//! Idempotent cache-table materialization.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hl_stats_core::RowSet;

use crate::database::DatabaseClient;
use crate::writer::TableWriter;

/// Materializes one date's aggregated rows into a cache table.
///
/// Uses delete-then-insert per date rather than an upsert: the grouping
/// keys themselves can change between runs when upstream schema evolves,
/// so there is no stable conflict target to upsert against.
#[derive(Debug, Clone)]
pub struct CacheWriter {
    db: DatabaseClient,
}

impl CacheWriter {
    #[must_use]
    pub fn new(db: DatabaseClient) -> Self {
        Self { db }
    }

    /// Replaces the cache rows for `date` with the given row set. Safe to
    /// call again for the same date; the result is identical to the first
    /// correct write.
    ///
    /// # Errors
    /// Returns `SchemaDrift` when the stored column set mismatches and the
    /// rewrite fallback fails, or an error if a database operation fails.
    pub async fn write(&self, date: NaiveDate, rows: &RowSet) -> Result<()> {
        tracing::debug!(
            table = rows.schema.table,
            %date,
            rows = rows.len(),
            "writing cache partition"
        );
        TableWriter::new(&self.db)
            .replace_partition(rows, "time", date)
            .await
            .with_context(|| format!("cache write failed for {} at {date}", rows.schema.table))
    }
}
