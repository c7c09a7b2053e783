//! Exchange info API client.
//!
//! The market-data source shards by instrument, and the instrument
//! universe is not stored in the dumps; it comes from the exchange's info
//! endpoint at run time.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Meta {
    universe: Vec<AssetInfo>,
}

#[derive(Debug, Deserialize)]
struct AssetInfo {
    name: String,
}

pub struct InfoClient {
    client: reqwest::Client,
    url: String,
}

impl InfoClient {
    #[must_use]
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }

    /// Fetches the tradable instrument names, in the exchange's listing
    /// order.
    pub async fn instrument_universe(&self) -> Result<Vec<String>> {
        let meta: Meta = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "type": "meta" }))
            .send()
            .await
            .context("requesting exchange meta")?
            .error_for_status()
            .context("exchange meta request rejected")?
            .json()
            .await
            .context("decoding exchange meta")?;

        let universe: Vec<String> = meta.universe.into_iter().map(|a| a.name).collect();
        debug!(instruments = universe.len(), "fetched instrument universe");
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_payload_decodes_to_instrument_names() {
        let payload = r#"{"universe":[{"name":"BTC","szDecimals":5},{"name":"ETH","szDecimals":4}]}"#;
        let meta: Meta = serde_json::from_str(payload).unwrap();
        let names: Vec<String> = meta.universe.into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["BTC", "ETH"]);
    }
}
