use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

use super::{dispatcher::NotificationSink, events::DomainEvent};

/// Writes every event to the structured log.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, event: &DomainEvent) -> Result<()> {
        let payload = serde_json::to_string(event)?;
        info!(
            event = event.name(),
            booking_id = %event.booking_id(),
            payload = %payload,
            "notifications: event"
        );
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "log"
    }
}

/// POSTs every event as JSON to a configured endpoint.
pub struct WebhookSink {
    webhook_url: Url,
    client: Client,
}

impl WebhookSink {
    pub fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build webhook http client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, event: &DomainEvent) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(event)
            .send()
            .await
            .map_err(sanitize_reqwest_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        Err(anyhow!(
            "notification webhook returned non-success status: {}",
            response.status()
        ))
    }

    fn sink_name(&self) -> &'static str {
        "webhook"
    }
}

// Webhook URLs may embed credentials; keep them out of error text.
fn sanitize_reqwest_error(error: reqwest::Error) -> anyhow::Error {
    if error.is_timeout() {
        return anyhow!("notification webhook request timed out");
    }
    if error.is_connect() {
        return anyhow!("notification webhook connection failed");
    }
    anyhow!("notification webhook request failed")
}
