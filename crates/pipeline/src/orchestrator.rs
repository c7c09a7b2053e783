//! Run orchestration.
//!
//! One run walks the configured sources in order. Per source: read the
//! cache high-water mark, resolve the dates to process, then for each date
//! fetch, decode, load the base table, aggregate, and write the cache
//! partition. A failed date stops that source for the run; the resolver
//! picks the date up again next run, so the cache never grows a hole
//! behind its own max date. Source failures are isolated from each other.

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, Utc};
use hl_stats_core::{AlertSink, AppConfig, Source};
use hl_stats_data::{CacheWriter, ConsistencyChecker, DatabaseClient, RawLoader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::aggregate;
use crate::decode::{decode_csv, decode_dynamic_csv, decode_l2_shard, decompress_lz4, CsvPartition};
use crate::locator;
use crate::meta::InfoClient;
use crate::models::{
    self, AccountValueRow, AssetCtxRow, FundingRow, LedgerUpdateRow, LiquidationRow, TradeRow,
};
use crate::resolver::resolve_dates;
use crate::slippage::{self, SnapshotMetrics};
use crate::store::{staging_path, ObjectStore};

enum DateOutcome {
    Processed,
    Skipped,
}

pub struct PipelineOrchestrator {
    config: AppConfig,
    db: DatabaseClient,
    store: Arc<dyn ObjectStore>,
    alerts: Arc<dyn AlertSink>,
    raw_loader: RawLoader,
    cache_writer: CacheWriter,
    checker: ConsistencyChecker,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(
        config: AppConfig,
        db: DatabaseClient,
        store: Arc<dyn ObjectStore>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let raw_loader = RawLoader::new(db.clone());
        let cache_writer = CacheWriter::new(db.clone());
        let checker = ConsistencyChecker::new(db.clone());
        Self {
            config,
            db,
            store,
            alerts,
            raw_loader,
            cache_writer,
            checker,
        }
    }

    /// Processes every configured source for dates up to today (UTC).
    ///
    /// # Errors
    /// Returns an error only when the run cannot start at all (the
    /// instrument universe is unavailable). Per-source failures are
    /// alerted and contained.
    pub async fn run(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        let sources = &self.config.pipeline.sources;

        let wants_market_data = sources
            .iter()
            .any(|name| Source::parse(name) == Some(Source::MarketData));
        let universe = if wants_market_data {
            InfoClient::new(&self.config.pipeline.info_url)
                .instrument_universe()
                .await
                .context("resolving the instrument universe")?
        } else {
            Vec::new()
        };

        for name in sources {
            let Some(source) = Source::parse(name) else {
                warn!(source = %name, "unknown source in configuration");
                self.alerts
                    .send(&format!("Unknown source in configuration: {name}"))
                    .await;
                continue;
            };
            self.run_source(source, today, &universe).await;
        }
        Ok(())
    }

    async fn run_source(&self, source: Source, today: NaiveDate, universe: &[String]) {
        info!(%source, "processing source");

        let cache_max = match self.db.max_date(source.cache_table(), "time").await {
            Ok(max) => max,
            Err(e) => {
                error!(%source, error = %format!("{e:#}"), "reading cache high-water mark failed");
                self.alerts
                    .send(&format!("Processing {source} failed: {e:#}"))
                    .await;
                return;
            }
        };

        // An empty cache means any base table is leftover state from a wiped
        // cache; both tiers rebuild together from the lookback window.
        if cache_max.is_none() {
            if let Some(base_table) = source.base_table() {
                if let Err(e) = self.db.drop_table(base_table).await {
                    error!(%source, error = %format!("{e:#}"), "dropping stale base table failed");
                    self.alerts
                        .send(&format!("Processing {source} failed: {e:#}"))
                        .await;
                    return;
                }
            }
        }

        let dates = resolve_dates(cache_max, today, self.config.pipeline.lookback_days);
        if dates.is_empty() {
            info!(%source, "nothing to process");
            self.alerts
                .send(&format!("Nothing to process for {source}"))
                .await;
            return;
        }

        for date in dates {
            let outcome = if source == Source::MarketData {
                self.process_market_data_date(date, universe).await
            } else {
                self.process_scalar_date(source, date)
                    .await
                    .map(|()| DateOutcome::Processed)
            };
            match outcome {
                Ok(DateOutcome::Processed) => {
                    info!(%source, %date, "date processed");
                    self.alerts
                        .send(&format!("Finished processing {source} for {date}"))
                        .await;
                }
                Ok(DateOutcome::Skipped) => {}
                Err(e) => {
                    error!(%source, %date, error = %format!("{e:#}"), "date failed");
                    self.alerts
                        .send(&format!("Processing {source} for {date} failed: {e:#}"))
                        .await;
                    // later dates would land beyond the gap and hide it from
                    // the next run's resolver
                    break;
                }
            }
        }

        match self.checker.check(source).await {
            Ok(None) => {}
            Ok(Some(message)) => {
                warn!(%source, "{message}");
                self.alerts.send(&message).await;
            }
            Err(e) => {
                warn!(%source, error = %format!("{e:#}"), "consistency check failed");
                self.alerts
                    .send(&format!("Consistency check for {source} failed: {e:#}"))
                    .await;
            }
        }
    }

    async fn process_scalar_date(&self, source: Source, date: NaiveDate) -> Result<()> {
        let key = locator::scalar_key(source, date);
        let staged = staging_path(&self.config.pipeline.staging_dir, &key);
        self.store.fetch(&key, &staged).await?;
        let compressed = tokio::fs::read(&staged)
            .await
            .with_context(|| format!("reading staged partition {}", staged.display()))?;
        let decompressed = decompress_lz4(&compressed, &key)?;

        match source {
            Source::Trades => {
                let part: CsvPartition<TradeRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::trades_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::trades::aggregate(date, &part.rows, part.has_column("tif"));
                self.cache_writer.write(date, &cache).await?;
            }
            Source::LedgerUpdates => {
                let part: CsvPartition<LedgerUpdateRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::ledger_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::ledger_updates::aggregate(date, &part.rows);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::Liquidations => {
                let part: CsvPartition<LiquidationRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::liquidations_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::liquidations::aggregate(date, &part.rows);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::Funding => {
                let part: CsvPartition<FundingRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::funding_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::funding::aggregate(date, &part.rows);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::AccountValues => {
                let part: CsvPartition<AccountValueRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::account_values_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::account_values::aggregate(date, &part.rows);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::AssetCtxs => {
                let part: CsvPartition<AssetCtxRow> = decode_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(date, &models::asset_ctxs_base_rowset(date, &part.rows))
                    .await?;
                let cache = aggregate::asset_ctxs::aggregate(date, &part.rows);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::TotalAccruedFees => {
                let table = decode_dynamic_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(
                        date,
                        &table.to_base_rowset(Source::TotalAccruedFees.name(), date),
                    )
                    .await?;
                let cache = aggregate::fees::aggregate(date, &table);
                self.cache_writer.write(date, &cache).await?;
            }
            Source::HlpPositions => {
                // oracle prices come from the same date's asset-ctxs partition
                let ctx_key = locator::scalar_key(Source::AssetCtxs, date);
                let ctx_staged = staging_path(&self.config.pipeline.staging_dir, &ctx_key);
                self.store.fetch(&ctx_key, &ctx_staged).await?;
                let ctx_compressed = tokio::fs::read(&ctx_staged)
                    .await
                    .with_context(|| format!("reading staged partition {}", ctx_staged.display()))?;
                let ctx_part: CsvPartition<AssetCtxRow> =
                    decode_csv(&decompress_lz4(&ctx_compressed, &ctx_key)?, &ctx_key)?;

                let positions = decode_dynamic_csv(&decompressed, &key)?;
                self.raw_loader
                    .load(
                        date,
                        &positions.to_base_rowset(Source::HlpPositions.name(), date),
                    )
                    .await?;
                let cache = aggregate::hlp_positions::aggregate(date, &ctx_part.rows, &positions)?;
                self.cache_writer.write(date, &cache).await?;

                tokio::fs::remove_file(&ctx_staged)
                    .await
                    .with_context(|| format!("removing staged partition {}", ctx_staged.display()))?;
            }
            Source::MarketData => unreachable!("market data is dispatched to the shard pool"),
        }

        tokio::fs::remove_file(&staged)
            .await
            .with_context(|| format!("removing staged partition {}", staged.display()))?;
        Ok(())
    }

    async fn process_market_data_date(
        &self,
        date: NaiveDate,
        universe: &[String],
    ) -> Result<DateOutcome> {
        let cache_table = Source::MarketData.cache_table();
        if self.db.date_exists(cache_table, "time", date).await? {
            info!(%date, "market data already processed");
            self.alerts
                .send(&format!("Market data already exists for {date}"))
                .await;
            return Ok(DateOutcome::Skipped);
        }
        if universe.is_empty() {
            bail!("instrument universe is empty");
        }

        let (metrics, failed) = collect_shard_metrics(
            Arc::clone(&self.store),
            &self.config.pipeline.staging_dir,
            date,
            universe,
            self.config.pipeline.shard_workers,
        )
        .await?;

        if metrics.is_empty() {
            bail!("no market data shards decoded for {date}");
        }
        if failed > 0 {
            self.alerts
                .send(&format!("{failed} market data shards failed for {date}"))
                .await;
        }

        let aggregates = slippage::reduce_day(metrics);
        let rows = aggregate::market_data::rows(date, &aggregates);
        self.cache_writer.write(date, &rows).await?;
        Ok(DateOutcome::Processed)
    }
}

/// Fans one date's 24 x N shard keys out to a bounded worker pool and
/// collects the surviving metrics. A failed shard is logged and counted;
/// its siblings' metrics still feed the day's reduction.
async fn collect_shard_metrics(
    store: Arc<dyn ObjectStore>,
    staging_dir: &Path,
    date: NaiveDate,
    universe: &[String],
    workers: usize,
) -> Result<(Vec<SnapshotMetrics>, usize)> {
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks: JoinSet<(String, Result<Vec<SnapshotMetrics>>)> = JoinSet::new();
    for hour in 0..24 {
        for instrument in universe {
            let key = locator::market_data_key(date, hour, instrument);
            let staged = staging_path(staging_dir, &key);
            let store = Arc::clone(&store);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (key, Err(anyhow!("worker pool closed"))),
                };
                let result = fetch_and_measure(&*store, &key, &staged).await;
                (key, result)
            });
        }
    }

    let mut metrics = Vec::new();
    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (key, result) = joined.context("market data worker panicked")?;
        match result {
            Ok(mut shard) => metrics.append(&mut shard),
            Err(e) => {
                warn!(%key, error = %format!("{e:#}"), "shard failed");
                failed += 1;
            }
        }
    }
    Ok((metrics, failed))
}

/// One shard's work: fetch, decompress, decode, measure. Snapshots with an
/// empty ladder carry no mid price and are dropped here.
async fn fetch_and_measure(
    store: &dyn ObjectStore,
    key: &str,
    staged: &Path,
) -> Result<Vec<SnapshotMetrics>> {
    store.fetch(key, staged).await?;
    let compressed = tokio::fs::read(staged)
        .await
        .with_context(|| format!("reading staged shard {}", staged.display()))?;
    let decompressed = decompress_lz4(&compressed, key)?;
    let snapshots = decode_l2_shard(&decompressed, key)?;
    tokio::fs::remove_file(staged)
        .await
        .with_context(|| format!("removing staged shard {}", staged.display()))?;
    Ok(snapshots
        .iter()
        .filter_map(slippage::snapshot_metrics)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hl_stats_core::PipelineError;
    use std::io::Write;

    /// Serves the same LZ4 shard for every key except one, which fails.
    struct OneBadShardStore {
        fail_key: String,
        payload: Vec<u8>,
    }

    #[async_trait]
    impl ObjectStore for OneBadShardStore {
        async fn fetch(&self, key: &str, dest: &Path) -> Result<()> {
            if key == self.fail_key {
                return Err(PipelineError::fetch(key, "503 Service Unavailable").into());
            }
            if let Some(parent) = dest.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(dest, &self.payload).await?;
            Ok(())
        }
    }

    fn shard_payload() -> Vec<u8> {
        let line = r#"{"raw":{"channel":"l2Book","data":{"coin":"BTC","time":1715299200000,"levels":[[{"px":"99.0","sz":"1.0","n":1}],[{"px":"101.0","sz":"2.0","n":1}]]}}}"#;
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(line.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn failed_shard_leaves_sibling_metrics_intact() {
        let staging = std::env::temp_dir().join(format!("hl-stats-shards-{}", std::process::id()));
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(OneBadShardStore {
            fail_key: locator::market_data_key(date, 7, "BTC"),
            payload: shard_payload(),
        });
        let universe = vec!["BTC".to_string()];

        let (metrics, failed) = collect_shard_metrics(store, &staging, date, &universe, 4)
            .await
            .unwrap();

        // 24 hourly shards, one broken: the other 23 snapshots all survive
        assert_eq!(failed, 1);
        assert_eq!(metrics.len(), 23);
        assert!(metrics.iter().all(|m| m.coin == "BTC"));
    }

    #[tokio::test]
    async fn clean_run_collects_every_shard() {
        let staging = std::env::temp_dir().join(format!("hl-stats-shards-ok-{}", std::process::id()));
        let date = chrono::NaiveDate::from_ymd_opt(2024, 5, 11).unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(OneBadShardStore {
            fail_key: String::new(),
            payload: shard_payload(),
        });
        let universe = vec!["BTC".to_string(), "ETH".to_string()];

        let (metrics, failed) = collect_shard_metrics(store, &staging, date, &universe, 4)
            .await
            .unwrap();

        assert_eq!(failed, 0);
        assert_eq!(metrics.len(), 48);
    }
}
