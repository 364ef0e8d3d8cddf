//! Append-only message assembly.

use serde_json::Value;

use crate::blocks::Block;

/// How loud the message is. Critical and warning messages carry a marker
/// prefix on their first line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Warning => "⚠️ ",
            Self::Critical => "🚨 ",
        }
    }
}

/// What the enforcement engine decided to do about an observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    Allow,
    Revert,
    /// Adjusted to the declared level, named so the alert can show it.
    Adjust { expected: String },
}

impl EnforcementOutcome {
    /// The annotation line appended to alerts.
    #[must_use]
    pub fn annotation(&self) -> String {
        match self {
            Self::Allow => "allowed".to_string(),
            Self::Revert => "automatically reverted".to_string(),
            Self::Adjust { expected } => {
                format!("adjusted to the correct state of `{expected}`")
            }
        }
    }
}

/// A fully assembled message ready for a sink.
#[derive(Debug, Clone)]
pub struct Message {
    pub severity: Severity,
    pub blocks: Vec<Block>,
    /// Originating event payload, forwarded as transport metadata.
    pub metadata: Option<Value>,
}

impl Message {
    /// Concatenated plain text of every block, for logs and assertions.
    #[must_use]
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builder collecting blocks for one message.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    severity: Severity,
    blocks: Vec<Block>,
    metadata: Option<Value>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the severity; it never goes back down.
    pub fn set_severity(&mut self, severity: Severity) -> &mut Self {
        if severity > self.severity {
            self.severity = severity;
        }
        self
    }

    /// Attach the originating event payload.
    pub fn set_metadata(&mut self, payload: Value) -> &mut Self {
        self.metadata = Some(payload);
        self
    }

    pub fn add_section(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::section(text));
        self
    }

    pub fn add_context(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::context(text));
        self
    }

    pub fn add_user(&mut self, login: &str, avatar_url: Option<&str>) -> &mut Self {
        self.blocks.push(Block::user(login, avatar_url));
        self
    }

    pub fn add_repository(&mut self, owner: &str, name: &str) -> &mut Self {
        self.blocks.push(Block::repository(owner, name));
        self
    }

    pub fn add_divider(&mut self) -> &mut Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn add_blocks(&mut self, blocks: impl IntoIterator<Item = Block>) -> &mut Self {
        self.blocks.extend(blocks);
        self
    }

    /// Annotate with the enforcement outcome.
    pub fn add_outcome(&mut self, outcome: &EnforcementOutcome) -> &mut Self {
        self.add_context(format!("_{}_", outcome.annotation()))
    }

    /// Number of blocks collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Finish the message, prefixing the first text block with the severity
    /// marker.
    #[must_use]
    pub fn build(mut self) -> Message {
        let marker = self.severity.marker();
        if !marker.is_empty() {
            if let Some(first) = self.blocks.first_mut() {
                let prefixed = format!("{marker}{}", first.text());
                *first = match first {
                    Block::Section { .. } => Block::section(prefixed),
                    Block::Context { .. } => Block::context(prefixed),
                    Block::Divider => Block::Divider,
                };
            }
        }
        Message {
            severity: self.severity,
            blocks: self.blocks,
            metadata: self.metadata,
        }
    }
}
