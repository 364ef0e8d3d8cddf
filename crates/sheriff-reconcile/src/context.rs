//! Shared run context and the per-org action reporter.

use std::sync::Arc;

use sheriff_alerts::{DynAlertSink, MessageBuilder, Severity};
use sheriff_github::ClientCache;

use crate::error::ReconcileResult;
use crate::plugins::PluginRegistry;

/// Everything one reconcile run needs. The dry-run flag here is the single
/// gate in front of every mutation; the credential provider additionally
/// narrows clients to read-only when it is set.
pub struct ReconcileContext {
    pub cache: Arc<ClientCache>,
    pub sink: DynAlertSink,
    pub plugins: PluginRegistry,
    pub dry_run: bool,
}

impl ReconcileContext {
    #[must_use]
    pub fn new(cache: Arc<ClientCache>, sink: DynAlertSink, plugins: PluginRegistry) -> Self {
        let dry_run = cache.dry_run();
        Self {
            cache,
            sink,
            plugins,
            dry_run,
        }
    }
}

/// Collects the narration of one org's reconcile.
///
/// Action lines accumulate as context blocks; at flush time the org banner
/// is prepended and the message sent — unless nothing happened, in which
/// case the banner is suppressed along with the whole message.
pub struct OrgReporter {
    org: String,
    builder: MessageBuilder,
    severity: Severity,
    actions: usize,
}

impl OrgReporter {
    #[must_use]
    pub fn new(org: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            builder: MessageBuilder::new(),
            severity: Severity::Normal,
            actions: 0,
        }
    }

    /// Record an action line.
    pub fn note(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(org = %self.org, "{text}");
        self.builder.add_context(text);
        self.actions += 1;
    }

    /// Record a warning line.
    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(org = %self.org, "{text}");
        self.severity = self.severity.max(Severity::Warning);
        self.builder.add_context(format!("⚠️ {text}"));
        self.actions += 1;
    }

    /// Record a critical line.
    pub fn critical(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::error!(org = %self.org, "{text}");
        self.severity = Severity::Critical;
        self.builder.add_context(format!("🚨 {text}"));
        self.actions += 1;
    }

    /// Visual break between repos. Dividers do not count as actions.
    pub fn divider(&mut self) {
        self.builder.add_divider();
    }

    /// Number of action lines recorded.
    #[must_use]
    pub fn actions(&self) -> usize {
        self.actions
    }

    /// Send the collected narration, banner first. A run with zero actions
    /// sends nothing.
    pub async fn flush(self, sink: &DynAlertSink) -> ReconcileResult<()> {
        if self.actions == 0 {
            return Ok(());
        }
        let mut banner = MessageBuilder::new();
        banner.add_section(format!("*Reconciling `{}`*", self.org));
        banner.add_blocks(self.builder.build().blocks);

        // Lines carry their own markers; only the message severity needs
        // to be lifted onto the combined send.
        let mut message = banner.build();
        message.severity = self.severity;
        sink.send(message).await?;
        Ok(())
    }
}
