//! Base-table loading of decoded partition rows.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hl_stats_core::RowSet;

use crate::database::DatabaseClient;
use crate::writer::TableWriter;

/// Appends one partition's raw rows to a source's base table.
///
/// Base tables carry a leading `day DATE` partition column ahead of the
/// verbatim dump columns. The load deletes that day's rows first, so a
/// retried date that previously failed mid-pipeline cannot leave duplicate
/// raw rows behind. Market data has no base table; the orchestrator skips
/// this stage for it.
#[derive(Debug, Clone)]
pub struct RawLoader {
    db: DatabaseClient,
}

impl RawLoader {
    #[must_use]
    pub fn new(db: DatabaseClient) -> Self {
        Self { db }
    }

    /// Loads one date's raw rows into the base table named by the row set.
    ///
    /// # Errors
    /// Returns an error if a database operation fails.
    pub async fn load(&self, day: NaiveDate, rows: &RowSet) -> Result<()> {
        tracing::debug!(
            table = rows.schema.table,
            %day,
            rows = rows.len(),
            "loading raw partition"
        );
        TableWriter::new(&self.db)
            .replace_partition(rows, "day", day)
            .await
            .with_context(|| format!("raw load failed for {} at {day}", rows.schema.table))
    }
}
