use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub object_store: ObjectStoreConfig,
    pub pipeline: PipelineConfig,
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreConfig {
    /// HTTP gateway the bucket is served from, e.g. an S3 endpoint.
    pub endpoint: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordered list of sources to process, by registry name.
    pub sources: Vec<String>,
    /// Local staging area for fetched partitions.
    pub staging_dir: PathBuf,
    /// Backfill window when a source has no cache state yet.
    pub lookback_days: i64,
    /// Bounded worker count for market-data shard fan-out.
    pub shard_workers: usize,
    /// Exchange info endpoint used to resolve the instrument universe.
    pub info_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlertConfig {
    /// Slack incoming-webhook URL; alerts fall back to the log when unset.
    pub slack_webhook_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            object_store: ObjectStoreConfig::default(),
            pipeline: PipelineConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/hl_stats".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://s3.amazonaws.com".to_string(),
            bucket: "hl-exchange-data".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "non_mm_trades".to_string(),
                "non_mm_ledger_updates".to_string(),
                "liquidations".to_string(),
                "funding".to_string(),
                "account_values".to_string(),
                "asset_ctxs".to_string(),
                "market_data".to_string(),
                "total_accrued_fees".to_string(),
                "hlp_positions".to_string(),
            ],
            staging_dir: PathBuf::from("tmp"),
            lookback_days: 85,
            shard_workers: 8,
            info_url: "https://api.hyperliquid.xyz/info".to_string(),
        }
    }
}
