//! Terminal alert sink for the CLI.
//!
//! Prints every message to stdout with severity coloring; in a live run
//! with a chat webhook configured, messages are forwarded there as well.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;

use sheriff_alerts::{AlertError, AlertSink, DynAlertSink, Message, Severity, SlackWebhookSink};
use sheriff_config::SheriffEnv;

struct ConsoleSink {
    forward: Option<SlackWebhookSink>,
}

#[async_trait]
impl AlertSink for ConsoleSink {
    async fn send(&self, message: Message) -> Result<(), AlertError> {
        for line in message.text().lines() {
            let rendered = match message.severity {
                Severity::Critical => line.red().to_string(),
                Severity::Warning => line.yellow().to_string(),
                Severity::Normal => line.to_string(),
            };
            println!("{rendered}");
        }
        if let Some(forward) = &self.forward {
            forward.send(message).await?;
        }
        Ok(())
    }
}

/// Console sink, forwarding to the chat webhook on live runs.
pub fn console_sink(env: &SheriffEnv, dry_run: bool) -> DynAlertSink {
    let forward = match (&env.slack_webhook_url, dry_run) {
        (Some(url), false) => Some(SlackWebhookSink::new(url.clone())),
        _ => None,
    };
    Arc::new(ConsoleSink { forward })
}
