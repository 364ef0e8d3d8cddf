//! Event classification and dispatch.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use sheriff_alerts::{DynAlertSink, Message, MessageBuilder, Severity};
use sheriff_config::SheriffEnv;
use sheriff_github::credentials::CredentialProvider;

use crate::dryrun::DryRunHarness;
use crate::enforcement::{self, Decision};
use crate::error::{WebhookError, WebhookResult};
use crate::events::{
    DeletePayload, DeployKeyPayload, MemberPayload, MetaPayload, OrganizationPayload,
    PatRequestPayload, PublicPayload, PullRequestPayload, ReleasePayload, RepositoryPayload,
};
use crate::releases;

/// Branch names whose deletion is always critical: release lines like
/// `12-x-y` and `1-2-x`.
fn is_release_line_branch(branch: &str) -> bool {
    use std::sync::OnceLock;
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            regex::Regex::new(r"(^[0-9]+-[0-9]+-x$)|(^[0-9]+-x-y$)")
                .expect("release line pattern is valid")
        })
        .is_match(branch)
}

/// Classifies and reacts to webhook deliveries.
pub struct EnforcementEngine {
    env: SheriffEnv,
    provider: Arc<dyn CredentialProvider>,
    sink: DynAlertSink,
    harness: Option<Arc<DryRunHarness>>,
}

impl EnforcementEngine {
    #[must_use]
    pub fn new(
        env: SheriffEnv,
        provider: Arc<dyn CredentialProvider>,
        sink: DynAlertSink,
        harness: Option<Arc<DryRunHarness>>,
    ) -> Self {
        Self {
            env,
            provider,
            sink,
            harness,
        }
    }

    /// Handle one delivery. Unknown events are logged and accepted.
    pub async fn handle_event(
        &self,
        event: &str,
        delivery_id: &str,
        payload: Value,
    ) -> WebhookResult<()> {
        tracing::info!(event, delivery_id, "webhook delivery received");

        match event {
            "delete" => self.on_delete(parse(event, &payload)?, payload).await,
            "deploy_key" => self.on_deploy_key(parse(event, &payload)?, payload).await,
            "member" => self.on_member(parse(event, &payload)?, payload).await,
            "meta" => self.on_meta(parse(event, &payload)?, payload).await,
            "organization" => self.on_organization(parse(event, &payload)?, payload).await,
            "repository" => self.on_repository(parse(event, &payload)?, payload).await,
            "public" => self.on_public(parse(event, &payload)?, payload).await,
            "release" => self.on_release(parse(event, &payload)?, payload).await,
            "personal_access_token_request" => {
                self.on_pat_request(parse(event, &payload)?, payload).await
            }
            "pull_request" => self.on_pull_request(parse(event, &payload)?).await,
            _ => {
                tracing::debug!(event, "unhandled event type");
                Ok(())
            }
        }
    }

    /// Whether the delivery was produced by sheriff itself. Some event
    /// types suppress alerting for self-events.
    fn is_self_event(&self, sender: &str) -> bool {
        self.env.self_login.as_deref() == Some(sender)
    }

    async fn send(&self, message: Message) -> WebhookResult<()> {
        self.sink.send(message).await?;
        Ok(())
    }

    async fn on_delete(&self, event: DeletePayload, raw: Value) -> WebhookResult<()> {
        match event.ref_type.as_str() {
            "tag" => {
                if self
                    .env
                    .trusted_releasers
                    .iter()
                    .any(|login| *login == event.sender.login)
                {
                    return Ok(());
                }
                let mut builder = MessageBuilder::new();
                builder.set_severity(Severity::Warning);
                builder.add_section(format!(
                    "Tag `{}` was deleted on {}",
                    event.git_ref,
                    event.repository.full_name()
                ));
                builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
                builder.set_metadata(raw);
                self.send(builder.build()).await
            }
            "branch" => {
                let important = is_release_line_branch(&event.git_ref)
                    || self.env.important_branch.as_deref() == Some(event.git_ref.as_str());
                if !important {
                    return Ok(());
                }
                let mut builder = MessageBuilder::new();
                builder.set_severity(Severity::Critical);
                builder.add_section(format!(
                    "Release branch `{}` was deleted on {}",
                    event.git_ref,
                    event.repository.full_name()
                ));
                builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
                builder.set_metadata(raw);
                self.send(builder.build()).await
            }
            _ => Ok(()),
        }
    }

    async fn on_deploy_key(&self, event: DeployKeyPayload, raw: Value) -> WebhookResult<()> {
        if event.action != "created" {
            return Ok(());
        }
        let severity = if !event.key.read_only {
            Severity::Critical
        } else if event.repository.private {
            Severity::Warning
        } else {
            return Ok(());
        };

        let mut builder = MessageBuilder::new();
        builder.set_severity(severity);
        builder.add_section(format!(
            "Deploy key `{}` ({}) was added to {}",
            event.key.title,
            if event.key.read_only {
                "read-only"
            } else {
                "read-write"
            },
            event.repository.full_name()
        ));
        builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_member(&self, event: MemberPayload, raw: Value) -> WebhookResult<()> {
        if !matches!(event.action.as_str(), "added" | "edited" | "removed") {
            return Ok(());
        }
        let decision =
            enforcement::enforce_member_change(&self.env, &self.provider, &event).await?;
        if decision == Decision::Allow {
            return Ok(());
        }
        self.send(enforcement::enforcement_alert(&event, &decision, raw))
            .await
    }

    async fn on_meta(&self, event: MetaPayload, raw: Value) -> WebhookResult<()> {
        if event.action != "deleted" {
            return Ok(());
        }
        let mut builder = MessageBuilder::new();
        builder.set_severity(Severity::Critical);
        let location = event
            .repository
            .as_ref()
            .map_or_else(|| "this org".to_string(), |repo| repo.full_name());
        builder.add_section(format!("The sheriff webhook on {location} was deleted"));
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_organization(&self, event: OrganizationPayload, raw: Value) -> WebhookResult<()> {
        let (severity, text) = match event.action.as_str() {
            "member_invited" => {
                let login = event
                    .invitation
                    .as_ref()
                    .and_then(|i| i.login.clone())
                    .unwrap_or_else(|| "an unknown user".to_string());
                (Severity::Normal, format!("`{login}` was invited to the organization"))
            }
            "member_added" => {
                let login = membership_login(&event);
                (Severity::Normal, format!("`{login}` joined the organization"))
            }
            "member_removed" => {
                let login = membership_login(&event);
                (Severity::Normal, format!("`{login}` was removed from the organization"))
            }
            "renamed" => (
                Severity::Critical,
                "The organization was renamed".to_string(),
            ),
            _ => return Ok(()),
        };

        let mut builder = MessageBuilder::new();
        builder.set_severity(severity);
        builder.add_section(text);
        builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_repository(&self, event: RepositoryPayload, raw: Value) -> WebhookResult<()> {
        let severity = match event.action.as_str() {
            "deleted" => Severity::Critical,
            "archived" => Severity::Warning,
            _ => return Ok(()),
        };
        if self.is_self_event(&event.sender.login) {
            return Ok(());
        }

        let mut builder = MessageBuilder::new();
        builder.set_severity(severity);
        builder.add_section(format!(
            "Repository {} was {}",
            event.repository.full_name(),
            event.action
        ));
        builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_public(&self, event: PublicPayload, raw: Value) -> WebhookResult<()> {
        if self.is_self_event(&event.sender.login) {
            return Ok(());
        }
        let mut builder = MessageBuilder::new();
        builder.set_severity(Severity::Warning);
        builder.add_section(format!(
            "Repository {} is now public",
            event.repository.full_name()
        ));
        builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_release(&self, event: ReleasePayload, raw: Value) -> WebhookResult<()> {
        let Some(severity) =
            releases::release_severity(&self.env, &self.provider, &event).await?
        else {
            return Ok(());
        };

        let mut builder = MessageBuilder::new();
        builder.set_severity(severity);
        builder.add_section(format!(
            "Release `{}` was {} on {}",
            event.release.tag_name,
            event.action,
            event.repository.full_name()
        ));
        builder.add_user(&event.sender.login, event.sender.avatar_url.as_deref());
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_pat_request(&self, event: PatRequestPayload, raw: Value) -> WebhookResult<()> {
        let severity = match event.action.as_str() {
            "created" => Severity::Normal,
            "approved" => Severity::Warning,
            _ => return Ok(()),
        };
        let mut builder = MessageBuilder::new();
        builder.set_severity(severity);
        builder.add_section(format!(
            "Personal access token request by `{}` was {}",
            event.personal_access_token_request.owner.login, event.action
        ));
        builder.set_metadata(raw);
        self.send(builder.build()).await
    }

    async fn on_pull_request(&self, event: PullRequestPayload) -> WebhookResult<()> {
        if let Some(harness) = &self.harness {
            harness.handle_pull_request(&event).await?;
        }
        Ok(())
    }
}

fn membership_login(event: &OrganizationPayload) -> String {
    event
        .membership
        .as_ref()
        .map_or_else(|| "an unknown user".to_string(), |m| m.user.login.clone())
}

fn parse<T: DeserializeOwned>(event: &str, payload: &Value) -> WebhookResult<T> {
    serde_json::from_value(payload.clone()).map_err(|e| WebhookError::malformed(event, e))
}
