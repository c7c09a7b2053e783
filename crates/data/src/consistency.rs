//! Base-vs-cache max-date reconciliation.

use anyhow::Result;
use chrono::NaiveDate;
use hl_stats_core::Source;

use crate::database::DatabaseClient;

/// Compares a source's base-table and cache-table maximum dates after a
/// run. Divergence is reported, never rolled back.
#[derive(Debug, Clone)]
pub struct ConsistencyChecker {
    db: DatabaseClient,
}

impl ConsistencyChecker {
    #[must_use]
    pub fn new(db: DatabaseClient) -> Self {
        Self { db }
    }

    /// Returns a divergence message when the two tiers disagree, `None`
    /// when they agree or the source has no base table.
    ///
    /// # Errors
    /// Returns an error if a database query fails.
    pub async fn check(&self, source: Source) -> Result<Option<String>> {
        let Some(base_table) = source.base_table() else {
            return Ok(None);
        };

        let cache_max = self.db.max_date(source.cache_table(), "time").await?;
        let base_max = self.db.max_date(base_table, "day").await?;

        Ok(divergence_message(source, base_max, cache_max))
    }
}

/// Pure comparison: a divergence exists when the cache has data and the
/// base table's max date differs from it.
#[must_use]
pub fn divergence_message(
    source: Source,
    base_max: Option<NaiveDate>,
    cache_max: Option<NaiveDate>,
) -> Option<String> {
    let cache = cache_max?;
    if base_max == Some(cache) {
        return None;
    }
    let base = base_max.map_or_else(|| "none".to_string(), |d| d.to_string());
    Some(format!(
        "Cache table for {source} has a different max date ({cache}) than the base table ({base})"
    ))
}
