//! Per-repository reconcile.
//!
//! Runs against the prefetched metadata: team grants, pending invitations,
//! direct collaborators, settings, fork-PR approval policy, visibility,
//! custom property values, and rulesets.

use std::collections::BTreeMap;

use sheriff_config::{OrganizationConfig, RepositoryConfig, Visibility};
use sheriff_github::client::DynGitHubClient;
use sheriff_github::types::{CustomPropertyValue, GitHubRepository, RepoPatch};
use sheriff_github::AccessLevel;

use crate::context::{OrgReporter, ReconcileContext};
use crate::error::ReconcileResult;
use crate::prefetch::RepoMetadata;
use crate::rulesets::{diff_rulesets, normalize_declared, project_observed};
use crate::teams::slugify;

/// A repository with at least this many stargazers (or an unknown count)
/// never has its visibility changed automatically.
pub const VISIBILITY_STARGAZER_LIMIT: u64 = 100;

/// The approval policy required when forks need actions approval.
const APPROVAL_POLICY_ALL: &str = "all_external_contributors";

pub struct RepoReconcileInput<'a> {
    pub org: &'a OrganizationConfig,
    pub repo: &'a RepositoryConfig,
    pub observed: &'a GitHubRepository,
    pub metadata: &'a RepoMetadata,
}

pub async fn reconcile_repo(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) -> ReconcileResult<()> {
    sync_repo_teams(ctx, reporter, client, input).await?;
    sync_invitations(ctx, reporter, client, input).await;
    sync_collaborators(ctx, reporter, client, input).await;
    add_missing_collaborators(ctx, reporter, client, input).await;
    sync_settings(ctx, reporter, client, input).await;
    sync_fork_approval(ctx, reporter, client, input).await?;
    sync_visibility(ctx, reporter, client, input).await;
    sync_properties(ctx, reporter, client, input).await?;
    sync_rulesets(ctx, reporter, client, input).await?;
    Ok(())
}

/// Align the teams attached to the repo with the declared grant map.
async fn sync_repo_teams(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) -> ReconcileResult<()> {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    for attached in &input.metadata.teams {
        match input.repo.teams.get(&attached.name) {
            None => {
                reporter.note(format!(
                    "Removing {} team from repo {repo_name}",
                    attached.name
                ));
                if !ctx.dry_run {
                    if let Err(err) = client
                        .remove_team_from_repo(org_name, &attached.slug, repo_name)
                        .await
                    {
                        tracing::warn!(org = org_name, repo = repo_name, team = %attached.slug, error = %err, "team removal failed");
                    }
                }
            }
            Some(declared_level) => {
                let observed_level = attached
                    .permissions
                    .as_ref()
                    .and_then(AccessLevel::from_flags);
                if observed_level != Some(*declared_level) {
                    reporter.note(format!(
                        "Updating {} team on repo {repo_name} to base access level {declared_level}",
                        attached.name
                    ));
                    put_team_permission(ctx, client, org_name, &attached.slug, repo_name, *declared_level)
                        .await;
                }
            }
        }
    }

    for (team_name, declared_level) in &input.repo.teams {
        let already_attached = input.metadata.teams.iter().any(|t| t.name == *team_name);
        if already_attached {
            continue;
        }
        reporter.note(format!(
            "Adding {team_name} team to repo {repo_name} at base access level {declared_level}"
        ));
        let slug = resolve_team_slug(ctx, org_name, team_name).await?;
        put_team_permission(ctx, client, org_name, &slug, repo_name, *declared_level).await;
    }
    Ok(())
}

/// Slug for a declared team, from the observed team listing. Falls back to
/// the derived slug for teams that only exist in dry-run narration.
async fn resolve_team_slug(
    ctx: &ReconcileContext,
    org_name: &str,
    team_name: &str,
) -> ReconcileResult<String> {
    let teams = ctx.cache.teams(org_name).await?;
    Ok(teams
        .iter()
        .find(|t| t.name == team_name)
        .map_or_else(|| slugify(team_name), |t| t.slug.clone()))
}

async fn put_team_permission(
    ctx: &ReconcileContext,
    client: &DynGitHubClient,
    org_name: &str,
    slug: &str,
    repo_name: &str,
    level: AccessLevel,
) {
    if ctx.dry_run {
        return;
    }
    if let Err(err) = client
        .put_team_repo_permission(org_name, slug, repo_name, level.to_github())
        .await
    {
        tracing::warn!(org = org_name, repo = repo_name, team = slug, error = %err, "team permission update failed");
    }
}

/// Apply the collaborator rules to pending invitations.
async fn sync_invitations(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    for invitation in &input.metadata.invitations {
        let login = invitation.invitee.login.as_str();
        match input.repo.external_collaborators.get(login) {
            None => {
                reporter.note(format!(
                    "Cancelling invitation for `{login}` on repo {repo_name}"
                ));
                if !ctx.dry_run {
                    if let Err(err) = client
                        .delete_repo_invitation(org_name, repo_name, invitation.id)
                        .await
                    {
                        tracing::warn!(org = org_name, repo = repo_name, login, error = %err, "invitation delete failed");
                    }
                }
            }
            Some(declared_level) => {
                let observed_level = AccessLevel::from_github(&invitation.permissions);
                if observed_level != Some(*declared_level) {
                    reporter.note(format!(
                        "Updating invitation for `{login}` on repo {repo_name} to `{declared_level}`"
                    ));
                    if !ctx.dry_run {
                        if let Err(err) = client
                            .update_repo_invitation(
                                org_name,
                                repo_name,
                                invitation.id,
                                declared_level.to_github(),
                            )
                            .await
                        {
                            tracing::warn!(org = org_name, repo = repo_name, login, error = %err, "invitation update failed");
                        }
                    }
                }
            }
        }
    }
}

/// Apply the collaborator rules to current direct collaborators.
async fn sync_collaborators(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    for collaborator in &input.metadata.collaborators {
        let login = collaborator.login.as_str();
        match input.repo.external_collaborators.get(login) {
            None => {
                reporter.note(format!(
                    "Removing collaborator `{login}` from repo {repo_name}"
                ));
                if !ctx.dry_run {
                    if let Err(err) =
                        client.remove_collaborator(org_name, repo_name, login).await
                    {
                        tracing::warn!(org = org_name, repo = repo_name, login, error = %err, "collaborator removal failed");
                    }
                }
            }
            Some(declared_level) => {
                let observed_level = AccessLevel::from_flags(&collaborator.permissions);
                if observed_level != Some(*declared_level) {
                    reporter.note(format!(
                        "Updating collaborator `{login}` on repo {repo_name} to `{declared_level}`"
                    ));
                    add_collaborator(ctx, client, org_name, repo_name, login, *declared_level)
                        .await;
                }
            }
        }
    }
}

/// Grant access to declared collaborators who are neither present nor
/// invited.
async fn add_missing_collaborators(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    for (login, declared_level) in &input.repo.external_collaborators {
        let present = input
            .metadata
            .collaborators
            .iter()
            .any(|c| c.login == *login);
        let invited = input
            .metadata
            .invitations
            .iter()
            .any(|i| i.invitee.login == *login);
        if present || invited {
            continue;
        }
        reporter.note(format!(
            "Adding collaborator `{login}` to repo {repo_name} at `{declared_level}`"
        ));
        add_collaborator(ctx, client, org_name, repo_name, login, *declared_level).await;
    }
}

async fn add_collaborator(
    ctx: &ReconcileContext,
    client: &DynGitHubClient,
    org_name: &str,
    repo_name: &str,
    login: &str,
    level: AccessLevel,
) {
    if ctx.dry_run {
        return;
    }
    if let Err(err) = client
        .add_collaborator(org_name, repo_name, login, level.to_github())
        .await
    {
        tracing::warn!(org = org_name, repo = repo_name, login, error = %err, "collaborator update failed");
    }
}

/// Effective settings fall back field-by-field to the org defaults.
async fn sync_settings(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    let effective_has_wiki = input
        .repo
        .settings
        .as_ref()
        .and_then(|s| s.has_wiki)
        .unwrap_or(input.org.repository_defaults.has_wiki);

    if input.observed.has_wiki != effective_has_wiki {
        reporter.note(format!(
            "Setting has_wiki to `{effective_has_wiki}` on repo {repo_name}"
        ));
        if !ctx.dry_run {
            let patch = RepoPatch {
                has_wiki: Some(effective_has_wiki),
                private: None,
            };
            if let Err(err) = client.update_repo(org_name, repo_name, &patch).await {
                tracing::warn!(org = org_name, repo = repo_name, error = %err, "settings update failed");
            }
        }
    }
}

fn forks_need_actions_approval(input: &RepoReconcileInput<'_>) -> bool {
    input
        .repo
        .settings
        .as_ref()
        .and_then(|s| s.forks_need_actions_approval)
        .or(input.org.repository_defaults.forks_need_actions_approval)
        .unwrap_or(false)
}

/// Require maintainer approval for workflow runs from fork PRs.
async fn sync_fork_approval(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) -> ReconcileResult<()> {
    if !forks_need_actions_approval(input) {
        return Ok(());
    }
    let effectively_private = match input.repo.visibility {
        Visibility::Private => true,
        Visibility::Public => false,
        Visibility::Current => input.observed.private,
    };
    if effectively_private {
        // Private repos do not take fork PRs from outside contributors.
        return Ok(());
    }

    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    let current = client.get_fork_pr_approval_policy(org_name, repo_name).await?;
    if current != APPROVAL_POLICY_ALL {
        reporter.note(format!(
            "Requiring actions approval for all external contributors on repo {repo_name}"
        ));
        if !ctx.dry_run {
            if let Err(err) = client
                .set_fork_pr_approval_policy(org_name, repo_name, APPROVAL_POLICY_ALL)
                .await
            {
                tracing::warn!(org = org_name, repo = repo_name, error = %err, "approval policy update failed");
            }
        }
    }
    Ok(())
}

/// Align visibility with the declaration, refusing when the stargazer count
/// marks the repo as too important for an automated flip.
async fn sync_visibility(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) {
    let should_be_private = match input.repo.visibility {
        Visibility::Current => return,
        Visibility::Private => true,
        Visibility::Public => false,
    };
    if input.observed.private == should_be_private {
        return;
    }

    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    match input.observed.stargazers_count {
        Some(stars) if stars < VISIBILITY_STARGAZER_LIMIT => {}
        Some(stars) => {
            reporter.critical(format!(
                "Aborting repository visibility update on repo {repo_name} as repo has `{stars}` stargazers"
            ));
            return;
        }
        None => {
            reporter.critical(format!(
                "Aborting repository visibility update on repo {repo_name} as its stargazer count is unknown"
            ));
            return;
        }
    }

    reporter.note(format!(
        "Making repo {repo_name} {}",
        if should_be_private { "private" } else { "public" }
    ));
    if !ctx.dry_run {
        let patch = RepoPatch {
            has_wiki: None,
            private: Some(should_be_private),
        };
        if let Err(err) = client.update_repo(org_name, repo_name, &patch).await {
            tracing::warn!(org = org_name, repo = repo_name, error = %err, "visibility update failed");
        }
    }
}

/// Expected property values: the repo's declarations, backfilled with org
/// property defaults the repo does not override.
#[must_use]
pub fn expected_property_values(
    org: &OrganizationConfig,
    repo: &RepositoryConfig,
) -> Vec<CustomPropertyValue> {
    let mut expected: BTreeMap<&str, serde_json::Value> = BTreeMap::new();
    for property in &org.custom_properties {
        if let Some(default) = &property.default_value {
            expected.insert(property.property_name.as_str(), default.to_json());
        }
    }
    for (name, value) in &repo.properties {
        expected.insert(name.as_str(), value.to_json());
    }

    expected
        .into_iter()
        .map(|(property_name, value)| CustomPropertyValue {
            property_name: property_name.to_string(),
            value,
        })
        .collect()
}

async fn sync_properties(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) -> ReconcileResult<()> {
    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();

    let expected = expected_property_values(input.org, input.repo);
    if expected.is_empty() && input.org.custom_properties.is_empty() {
        return Ok(());
    }

    let mut observed: Vec<CustomPropertyValue> = client
        .get_repo_properties(org_name, repo_name)
        .await?
        .into_iter()
        .filter(|value| !value.value.is_null())
        .collect();
    observed.sort_by(|a, b| a.property_name.cmp(&b.property_name));

    if observed != expected {
        reporter.note(format!(
            "Updating custom property values on repo {repo_name}"
        ));
        if !ctx.dry_run {
            if let Err(err) = client.set_repo_properties(org_name, repo_name, &expected).await {
                tracing::warn!(org = org_name, repo = repo_name, error = %err, "property values update failed");
            }
        }
    }
    Ok(())
}

/// Delete, create and update rulesets so the observed set matches the
/// declared one in canonical form.
async fn sync_rulesets(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    input: &RepoReconcileInput<'_>,
) -> ReconcileResult<()> {
    if !input.repo.declares_rulesets() && input.metadata.rulesets.is_empty() {
        return Ok(());
    }

    let org_name = input.org.organization.as_str();
    let repo_name = input.repo.name.as_str();
    let teams = ctx.cache.teams(org_name).await?;

    for observed in &input.metadata.rulesets {
        let declared = input.repo.rulesets().any(|r| r.name == observed.name);
        if !declared {
            reporter.note(format!(
                "Deleting ruleset `{}` from repo {repo_name}",
                observed.name
            ));
            if !ctx.dry_run {
                if let Some(id) = observed.id {
                    if let Err(err) = client.delete_repo_ruleset(org_name, repo_name, id).await {
                        tracing::warn!(org = org_name, repo = repo_name, ruleset = %observed.name, error = %err, "ruleset delete failed");
                    }
                }
            }
        }
    }

    for declared in input.repo.rulesets() {
        let normalized = normalize_declared(declared, &teams);
        match input
            .metadata
            .rulesets
            .iter()
            .find(|r| r.name == declared.name)
        {
            None => {
                reporter.note(format!(
                    "Creating ruleset `{}` on repo {repo_name}",
                    declared.name
                ));
                if !ctx.dry_run {
                    if let Err(err) =
                        client.create_repo_ruleset(org_name, repo_name, &normalized).await
                    {
                        tracing::warn!(org = org_name, repo = repo_name, ruleset = %declared.name, error = %err, "ruleset create failed");
                    }
                }
            }
            Some(observed) => {
                let projected = project_observed(observed.clone());
                let diff = diff_rulesets(&normalized, &projected);
                if diff.is_empty() {
                    continue;
                }
                // The colored crate drops the escapes itself when the
                // destination is not a terminal.
                reporter.note(format!(
                    "Updating ruleset `{}` on repo {repo_name}:\n{}",
                    declared.name,
                    diff.render(true)
                ));
                if !ctx.dry_run {
                    if let Some(id) = observed.id {
                        if let Err(err) = client
                            .update_repo_ruleset(org_name, repo_name, id, &normalized)
                            .await
                        {
                            tracing::warn!(org = org_name, repo = repo_name, ruleset = %declared.name, error = %err, "ruleset update failed");
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
