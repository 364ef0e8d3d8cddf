//! Alert delivery.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::blocks::Block;
use crate::message::Message;

/// The transport rejects payloads beyond this many blocks per send.
const MAX_BLOCKS_PER_SEND: usize = 50;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("alert rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Destination for assembled messages.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), AlertError>;
}

/// Convenience alias for a shared sink trait object.
pub type DynAlertSink = Arc<dyn AlertSink>;

/// Slack incoming-webhook transport. Messages longer than the transport
/// limit are chunked into consecutive sends of at most 50 blocks.
pub struct SlackWebhookSink {
    http: reqwest::Client,
    webhook_url: String,
}

impl SlackWebhookSink {
    #[must_use]
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for SlackWebhookSink {
    async fn send(&self, message: Message) -> Result<(), AlertError> {
        let metadata = message.metadata.clone();
        for chunk in message.blocks.chunks(MAX_BLOCKS_PER_SEND) {
            let mut payload = json!({
                "blocks": chunk.iter().map(Block::to_json).collect::<Vec<_>>(),
            });
            if let Some(metadata) = &metadata {
                payload["metadata"] = json!({
                    "event_type": "sheriff_alert",
                    "event_payload": metadata,
                });
            }

            let response = self.http.post(&self.webhook_url).json(&payload).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(AlertError::Rejected {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
        }
        Ok(())
    }
}

/// Sink that only writes to the log. Used when no chat transport is
/// configured.
#[derive(Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn send(&self, message: Message) -> Result<(), AlertError> {
        for line in message.text().lines() {
            tracing::info!(target: "sheriff_alerts", "{line}");
        }
        Ok(())
    }
}

/// Sink that records messages in memory. Used by tests and by the dry-run
/// reconciler output capture.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Message>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.messages.lock().await.clone()
    }

    /// Plain-text lines of every recorded message.
    pub async fn lines(&self) -> Vec<String> {
        self.messages
            .lock()
            .await
            .iter()
            .flat_map(|m| m.text().lines().map(str::to_string).collect::<Vec<_>>())
            .collect()
    }
}

#[async_trait]
impl AlertSink for MemorySink {
    async fn send(&self, message: Message) -> Result<(), AlertError> {
        self.messages.lock().await.push(message);
        Ok(())
    }
}
