//! Slack block structures, reduced to the shapes sheriff emits.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// One message block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// A markdown paragraph.
    Section { text: TextObject },
    /// Small grey line of mixed text and images.
    Context { elements: Vec<ContextElement> },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextElement {
    Mrkdwn { text: String },
    Image { image_url: String, alt_text: String },
}

impl Block {
    /// A markdown section block.
    #[must_use]
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: TextObject::Mrkdwn { text: text.into() },
        }
    }

    /// A context block with a single markdown element.
    #[must_use]
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![ContextElement::Mrkdwn { text: text.into() }],
        }
    }

    /// A context block showing a user's avatar next to their login.
    #[must_use]
    pub fn user(login: &str, avatar_url: Option<&str>) -> Self {
        let mut elements = Vec::with_capacity(2);
        if let Some(url) = avatar_url {
            elements.push(ContextElement::Image {
                image_url: url.to_string(),
                alt_text: login.to_string(),
            });
        }
        elements.push(ContextElement::Mrkdwn {
            text: format!("*<https://github.com/{login}|{login}>*"),
        });
        Self::Context { elements }
    }

    /// A context block linking a repository.
    #[must_use]
    pub fn repository(owner: &str, name: &str) -> Self {
        Self::Context {
            elements: vec![ContextElement::Mrkdwn {
                text: format!("*<https://github.com/{owner}/{name}|{owner}/{name}>*"),
            }],
        }
    }

    /// The plain text carried by this block, for logs and assertions.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Section {
                text: TextObject::Mrkdwn { text },
            } => text.clone(),
            Self::Context { elements } => elements
                .iter()
                .filter_map(|e| match e {
                    ContextElement::Mrkdwn { text } => Some(text.as_str()),
                    ContextElement::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(" "),
            Self::Divider => String::new(),
        }
    }

    /// Wire form for the webhook payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({"type": "divider"}))
    }
}
