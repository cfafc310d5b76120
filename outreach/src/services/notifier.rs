//! Notification sinks: structured log lines and HTTP webhooks

use async_trait::async_trait;
use std::time::Duration;

use shared::{component_info, Component, NotificationEvent};

use crate::error::SourceError;
use crate::traits::NotificationSink;

/// Writes every notification to the log
pub struct LoggingNotificationSink;

#[async_trait]
impl NotificationSink for LoggingNotificationSink {
    async fn notify(&self, event: NotificationEvent) -> Result<(), SourceError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| SourceError::Permanent(format!("unserializable notification: {e}")))?;
        component_info!(
            Component::Notifier,
            campaign_id = %event.campaign_id(),
            kind = event.kind(),
            "🔔 {}",
            payload
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a fixed URL
pub struct WebhookNotificationSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Permanent(format!("webhook client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, event: NotificationEvent) -> Result<(), SourceError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&event)
            .send()
            .await
            .map_err(|e| SourceError::Transient(format!("webhook unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status.as_u16() {
            408 | 429 => Err(SourceError::Transient(format!("webhook returned {status}"))),
            code if code >= 500 => Err(SourceError::Transient(format!("webhook returned {status}"))),
            _ => Err(SourceError::Permanent(format!("webhook rejected notification: {status}"))),
        }
    }
}
