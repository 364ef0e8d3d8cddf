//! Collaborator-change enforcement.
//!
//! A `member.*` event means someone touched repo access outside the
//! permissions file. The engine re-validates the current document, decides
//! ALLOW / REVERT / ADJUST, applies the corrective mutation, and alerts on
//! anything it had to fix. Collaborator state is re-read immediately before
//! the comparison; a racing second change simply triggers a second event.

use std::sync::Arc;

use sheriff_alerts::{EnforcementOutcome, MessageBuilder, Severity};
use sheriff_config::{loader, OrganizationConfig, SheriffEnv};
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::AccessLevel;

use crate::error::WebhookResult;
use crate::events::MemberPayload;

/// What enforcement decided, carrying the alert annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Revert,
    Adjust { expected: AccessLevel },
}

impl Decision {
    #[must_use]
    pub fn outcome(&self) -> EnforcementOutcome {
        match self {
            Self::Allow => EnforcementOutcome::Allow,
            Self::Revert => EnforcementOutcome::Revert,
            Self::Adjust { expected } => EnforcementOutcome::Adjust {
                expected: expected.to_string(),
            },
        }
    }
}

/// Decide and apply. Returns the decision so the caller can alert.
pub async fn enforce_member_change(
    env: &SheriffEnv,
    provider: &Arc<dyn CredentialProvider>,
    payload: &MemberPayload,
) -> WebhookResult<Decision> {
    let org_name = payload.repository.owner.login.as_str();
    let repo_name = payload.repository.name.as_str();
    let login = payload.member.login.as_str();

    let config_client = provider
        .client_for_org(&env.permissions_file_org, true)
        .await?;
    let orgs = loader::load(env, Some(config_client.as_ref())).await?;

    let Some(org) = orgs.iter().find(|o| o.organization == org_name) else {
        return Ok(Decision::Allow);
    };
    let Some(repo) = org.repository(repo_name) else {
        return Ok(Decision::Allow);
    };

    let expected = repo.external_collaborators.get(login).copied();
    let client = provider.client_for_org(org_name, false).await?;

    // Org owners hold admin everywhere; the platform does not permit less.
    if is_org_owner(&client, org, login).await? {
        return Ok(Decision::Allow);
    }

    let Some(expected) = expected else {
        if payload.action == "removed" {
            return Ok(Decision::Allow);
        }
        tracing::info!(org = org_name, repo = repo_name, login, "removing undeclared collaborator");
        client.remove_collaborator(org_name, repo_name, login).await?;
        return Ok(Decision::Revert);
    };

    let collaborators = client.list_direct_collaborators(org_name, repo_name).await?;
    let current = collaborators
        .iter()
        .find(|c| c.login == login)
        .and_then(|c| AccessLevel::from_flags(&c.permissions));

    if current == Some(expected) {
        return Ok(Decision::Allow);
    }

    tracing::info!(
        org = org_name,
        repo = repo_name,
        login,
        expected = %expected,
        "restoring declared collaborator level"
    );
    client
        .add_collaborator(org_name, repo_name, login, expected.to_github())
        .await?;

    if payload.action == "removed" {
        Ok(Decision::Revert)
    } else {
        Ok(Decision::Adjust { expected })
    }
}

async fn is_org_owner(
    client: &sheriff_github::client::DynGitHubClient,
    org: &OrganizationConfig,
    login: &str,
) -> WebhookResult<bool> {
    let owners = client.list_org_owners(&org.organization).await?;
    Ok(owners.iter().any(|o| o.login == login))
}

/// Build the alert for a non-ALLOW decision.
#[must_use]
pub fn enforcement_alert(
    payload: &MemberPayload,
    decision: &Decision,
    raw_payload: serde_json::Value,
) -> sheriff_alerts::Message {
    let mut builder = MessageBuilder::new();
    builder.set_severity(Severity::Critical);
    builder.add_section(format!(
        "Collaborator permissions on {} changed outside the permissions file",
        payload.repository.full_name()
    ));
    builder.add_user(&payload.member.login, payload.member.avatar_url.as_deref());
    builder.add_repository(&payload.repository.owner.login, &payload.repository.name);
    builder.add_outcome(&decision.outcome());
    builder.set_metadata(raw_payload);
    builder.build()
}
