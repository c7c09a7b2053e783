//! Object-store access for dump partitions.
//!
//! Partitions are fetched over plain HTTP from an S3-compatible store into
//! a local staging directory, decoded, and the staged file removed.
//! Fetches are rate limited globally; the market-data worker pool would
//! otherwise burst thousands of shard requests per day.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use hl_stats_core::PipelineError;
use tracing::debug;

type GovernorLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

const FETCH_RPS: u32 = 20;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Downloads `key` into `dest`, creating parent directories as needed.
    async fn fetch(&self, key: &str, dest: &Path) -> Result<()>;
}

pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    limiter: Arc<GovernorLimiter>,
}

impl HttpObjectStore {
    #[must_use]
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        let rps = NonZeroU32::new(FETCH_RPS).unwrap();
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn fetch(&self, key: &str, dest: &Path) -> Result<()> {
        self.limiter.until_ready().await;

        let url = self.url(key);
        debug!(%url, "fetching partition");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PipelineError::fetch(key, e))?;
        if !response.status().is_success() {
            return Err(PipelineError::fetch(key, format!("status {}", response.status())).into());
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::fetch(key, e))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating staging directory {}", parent.display()))?;
        }
        tokio::fs::write(dest, &body)
            .await
            .with_context(|| format!("writing staged partition {}", dest.display()))?;
        Ok(())
    }
}

/// Local staging location for an object key, mirroring the key's path
/// layout under the staging root.
#[must_use]
pub fn staging_path(staging_dir: &Path, key: &str) -> PathBuf {
    staging_dir.join(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_endpoint_bucket_and_key() {
        let store = HttpObjectStore::new("http://store.example.com/", "hl-dumps");
        assert_eq!(
            store.url("funding/20240510.csv.lz4"),
            "http://store.example.com/hl-dumps/funding/20240510.csv.lz4"
        );
    }

    #[test]
    fn staging_path_mirrors_the_key_layout() {
        let path = staging_path(Path::new("/tmp/staging"), "market_data/20240510/3/l2Book/BTC.lz4");
        assert_eq!(
            path,
            Path::new("/tmp/staging/market_data/20240510/3/l2Book/BTC.lz4")
        );
    }
}
