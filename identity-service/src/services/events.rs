//! Domain event publishing.
//!
//! Publishing is fire-and-forget: callers never wait on delivery and failures
//! are only logged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::EventsConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum IdentityEvent {
    #[serde(rename = "user.registered")]
    UserRegistered {
        user_id: Uuid,
        email: String,
        first_name: String,
        last_name: String,
        occurred_at: DateTime<Utc>,
    },
}

impl IdentityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            IdentityEvent::UserRegistered { .. } => "user.registered",
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &IdentityEvent) -> anyhow::Result<()>;
}

/// Publisher that only records events in the log.
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &IdentityEvent) -> anyhow::Result<()> {
        tracing::info!(event = event.name(), payload = ?event, "Identity event");
        Ok(())
    }
}

/// Publisher that POSTs each event as JSON to a webhook.
pub struct WebhookEventPublisher {
    client: reqwest::Client,
    url: String,
}

impl WebhookEventPublisher {
    pub fn new(url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build webhook client: {}", e))?;

        tracing::info!(url = %url, "Event webhook configured");
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl EventPublisher for WebhookEventPublisher {
    async fn publish(&self, event: &IdentityEvent) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(event = event.name(), "Event delivered to webhook");
        Ok(())
    }
}

/// Choose the publisher from configuration.
pub fn publisher_from_config(config: &EventsConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    Ok(match &config.webhook_url {
        Some(url) => Arc::new(WebhookEventPublisher::new(
            url,
            Duration::from_secs(config.timeout_seconds),
        )?),
        None => Arc::new(LogEventPublisher),
    })
}

/// Publish on a background task; the caller does not wait.
pub fn publish_in_background(publisher: Arc<dyn EventPublisher>, event: IdentityEvent) {
    tokio::spawn(async move {
        if let Err(e) = publisher.publish(&event).await {
            tracing::warn!(event = event.name(), error = %e, "Failed to publish event");
        }
    });
}

/// Publisher that keeps events in memory, for tests.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: tokio::sync::Mutex<Vec<IdentityEvent>>,
}

impl RecordingEventPublisher {
    pub async fn events(&self) -> Vec<IdentityEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, event: &IdentityEvent) -> anyhow::Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
