//! Trusted-releaser policy for release events.

use std::sync::Arc;

use sheriff_alerts::Severity;
use sheriff_config::SheriffEnv;
use sheriff_github::credentials::CredentialProvider;

use crate::error::WebhookResult;
use crate::events::ReleasePayload;

/// Severity for a release event, or `None` when the event should be
/// ignored entirely (trusted sender, irrelevant action).
pub async fn release_severity(
    env: &SheriffEnv,
    provider: &Arc<dyn CredentialProvider>,
    payload: &ReleasePayload,
) -> WebhookResult<Option<Severity>> {
    if env
        .trusted_releasers
        .iter()
        .any(|login| *login == payload.sender.login)
    {
        return Ok(None);
    }

    let base = match payload.action.as_str() {
        "deleted" => Severity::Critical,
        "unpublished" | "edited" => Severity::Warning,
        "created" | "published" | "prereleased" => Severity::Normal,
        _ => return Ok(None),
    };

    for policy in &env.trusted_releaser_policies {
        let matches = policy.actions.iter().any(|a| *a == payload.action)
            && policy.releaser == payload.sender.login
            && policy.repository == payload.repository.name;
        if !matches {
            continue;
        }

        // An automated releaser is only trusted when the same tag already
        // exists on the matching upstream repository. A missing upstream
        // release signals a rogue automated release.
        let owner = payload.repository.owner.login.as_str();
        let client = provider.client_for_org(owner, true).await?;
        let upstream = client
            .get_release_by_tag(owner, &policy.must_match_repo, &payload.release.tag_name)
            .await?;
        return if upstream.is_some() {
            Ok(None)
        } else {
            Ok(Some(Severity::Critical))
        };
    }

    Ok(Some(base))
}
