//! Best-effort alert delivery.
//!
//! The pipeline treats the alert transport as fire-and-forget: a sink that
//! fails to deliver logs the failure and returns, so a broken webhook can
//! never fail a run.

use crate::config::AlertConfig;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Delivers a message, best effort.
    async fn send(&self, message: &str);
}

/// Fallback sink that surfaces alerts through the log.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, message: &str) {
        tracing::warn!(alert = true, "{message}");
    }
}

/// Posts alerts to a Slack incoming webhook.
pub struct SlackWebhookSink {
    client: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhookSink {
    #[must_use]
    pub fn new(webhook_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl AlertSink for SlackWebhookSink {
    async fn send(&self, message: &str) {
        tracing::info!(alert = true, "{message}");
        let body = serde_json::json!({ "text": message });
        match self.client.post(&self.webhook_url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::error!(
                    status = %response.status(),
                    "alert webhook rejected message"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("alert delivery failed: {e}");
            }
        }
    }
}

/// Picks the webhook sink when configured, the log sink otherwise.
#[must_use]
pub fn sink_from_config(config: &AlertConfig) -> Arc<dyn AlertSink> {
    match &config.slack_webhook_url {
        Some(url) if !url.is_empty() => Arc::new(SlackWebhookSink::new(url.clone())),
        _ => Arc::new(LogAlertSink),
    }
}
