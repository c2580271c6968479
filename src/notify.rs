//! Handoff notification sinks

use crate::runtime::{HandoffSnapshot, NotificationSink, NotifyError};
use async_trait::async_trait;
use std::time::Duration;

fn log_snapshot(snapshot: &HandoffSnapshot) {
    match serde_json::to_string(snapshot) {
        Ok(json) => tracing::info!(
            identity = %snapshot.identity,
            notification_id = %snapshot.notification_id,
            snapshot = %json,
            "Human handoff requested"
        ),
        Err(e) => tracing::warn!(
            identity = %snapshot.identity,
            error = %e,
            "Failed to serialize handoff snapshot"
        ),
    }
    tracing::info!(identity = %snapshot.identity, "{}", snapshot.operator_summary());
}

/// Writes snapshots to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, snapshot: &HandoffSnapshot) -> Result<(), NotifyError> {
        log_snapshot(snapshot);
        Ok(())
    }
}

/// POSTs the snapshot JSON to an operator endpoint
pub struct WebhookNotificationSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotificationSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, snapshot: &HandoffSnapshot) -> Result<(), NotifyError> {
        log_snapshot(snapshot);

        let response = self.http.post(&self.url).json(snapshot).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        tracing::debug!(url = %self.url, "Handoff delivered to webhook");
        Ok(())
    }
}
