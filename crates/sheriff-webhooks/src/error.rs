//! Webhook engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// Delivery signature did not verify; the request is rejected.
    #[error("webhook signature verification failed")]
    BadSignature,

    /// Payload did not parse into the expected event shape.
    #[error("malformed {event} payload: {message}")]
    MalformedPayload { event: String, message: String },

    #[error(transparent)]
    Config(#[from] sheriff_config::ConfigError),

    #[error(transparent)]
    GitHub(#[from] sheriff_github::GitHubError),

    #[error(transparent)]
    Alert(#[from] sheriff_alerts::AlertError),

    /// Dry-run harness plumbing failure (temp file, subprocess, queue).
    #[error("dry-run harness failure: {0}")]
    Harness(String),
}

impl WebhookError {
    pub fn malformed(event: &str, err: impl std::fmt::Display) -> Self {
        Self::MalformedPayload {
            event: event.to_string(),
            message: err.to_string(),
        }
    }
}

pub type WebhookResult<T> = std::result::Result<T, WebhookError>;
