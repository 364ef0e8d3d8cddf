//! The [`GitHubClient`] trait — the seam between the engine and the platform.
//!
//! Every platform interaction the reconciler, webhook engine and dry-run
//! harness perform goes through this trait, so tests can substitute an
//! in-memory implementation and record the mutations an engine run issued.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GitHubResult;
use crate::types::{
    CheckRunInput, Collaborator, ContentFile, CreatedGist, CustomPropertySchema,
    CustomPropertyValue, GitHubRepository, GitHubTeam, GitHubUser, NewRepository, NewTeam,
    OrgInvitation, PullRequest, Release, RepoInvitation, RepoPatch, RepoRuleset, TeamPatch,
    TeamRole,
};

/// Convenience alias for a shared client trait object.
pub type DynGitHubClient = Arc<dyn GitHubClient>;

/// Async client over the GitHub operations sheriff performs.
///
/// Read operations may be served from a stale view; mutating operations are
/// expected to fail with [`crate::GitHubError::ReadOnly`] on clients issued
/// with narrowed credentials.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    // --- organization ---

    /// All members of the organization.
    async fn list_org_members(&self, org: &str) -> GitHubResult<Vec<GitHubUser>>;

    /// Members holding the organization `admin` role.
    async fn list_org_owners(&self, org: &str) -> GitHubResult<Vec<GitHubUser>>;

    /// Pending organization invitations.
    async fn list_org_invitations(&self, org: &str) -> GitHubResult<Vec<OrgInvitation>>;

    /// Invite an existing platform user as a `direct_member`.
    async fn create_org_invitation(&self, org: &str, user_id: i64) -> GitHubResult<()>;

    /// Resolve a user by login. The returned login is canonical and may
    /// differ from the query in case.
    async fn get_user(&self, login: &str) -> GitHubResult<GitHubUser>;

    // --- custom properties ---

    async fn list_custom_properties(&self, org: &str) -> GitHubResult<Vec<CustomPropertySchema>>;

    async fn upsert_custom_property(
        &self,
        org: &str,
        schema: &CustomPropertySchema,
    ) -> GitHubResult<()>;

    async fn delete_custom_property(&self, org: &str, property_name: &str) -> GitHubResult<()>;

    async fn get_repo_properties(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<CustomPropertyValue>>;

    async fn set_repo_properties(
        &self,
        org: &str,
        repo: &str,
        values: &[CustomPropertyValue],
    ) -> GitHubResult<()>;

    // --- teams ---

    async fn list_teams(&self, org: &str) -> GitHubResult<Vec<GitHubTeam>>;

    async fn create_team(&self, org: &str, team: &NewTeam) -> GitHubResult<GitHubTeam>;

    async fn update_team(&self, org: &str, slug: &str, patch: &TeamPatch) -> GitHubResult<()>;

    async fn delete_team(&self, org: &str, slug: &str) -> GitHubResult<()>;

    /// Immediate (non-inherited) team members holding `role`, by login.
    /// Served by the GraphQL membership query, capped at 100 per role.
    async fn team_members_by_role(
        &self,
        org: &str,
        slug: &str,
        role: TeamRole,
    ) -> GitHubResult<Vec<String>>;

    async fn put_team_membership(
        &self,
        org: &str,
        slug: &str,
        login: &str,
        role: TeamRole,
    ) -> GitHubResult<()>;

    async fn remove_team_membership(&self, org: &str, slug: &str, login: &str) -> GitHubResult<()>;

    // --- repositories ---

    async fn list_repos(&self, org: &str) -> GitHubResult<Vec<GitHubRepository>>;

    async fn get_repo(&self, org: &str, repo: &str) -> GitHubResult<GitHubRepository>;

    async fn create_repo(&self, org: &str, repo: &NewRepository) -> GitHubResult<GitHubRepository>;

    async fn update_repo(&self, org: &str, repo: &str, patch: &RepoPatch) -> GitHubResult<()>;

    /// Teams attached to a repository, with their permission bitmaps.
    async fn list_repo_teams(&self, org: &str, repo: &str) -> GitHubResult<Vec<GitHubTeam>>;

    async fn put_team_repo_permission(
        &self,
        org: &str,
        team_slug: &str,
        repo: &str,
        permission: &str,
    ) -> GitHubResult<()>;

    async fn remove_team_from_repo(
        &self,
        org: &str,
        team_slug: &str,
        repo: &str,
    ) -> GitHubResult<()>;

    /// Direct (non-team) collaborators.
    async fn list_direct_collaborators(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<Collaborator>>;

    /// Add a collaborator or update an existing one's permission.
    async fn add_collaborator(
        &self,
        org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> GitHubResult<()>;

    async fn remove_collaborator(&self, org: &str, repo: &str, login: &str) -> GitHubResult<()>;

    async fn list_repo_invitations(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<RepoInvitation>>;

    async fn update_repo_invitation(
        &self,
        org: &str,
        repo: &str,
        invitation_id: i64,
        permission: &str,
    ) -> GitHubResult<()>;

    async fn delete_repo_invitation(
        &self,
        org: &str,
        repo: &str,
        invitation_id: i64,
    ) -> GitHubResult<()>;

    // --- actions settings ---

    /// Current fork-PR workflow approval policy for the repository.
    async fn get_fork_pr_approval_policy(&self, org: &str, repo: &str) -> GitHubResult<String>;

    async fn set_fork_pr_approval_policy(
        &self,
        org: &str,
        repo: &str,
        policy: &str,
    ) -> GitHubResult<()>;

    // --- rulesets ---

    /// Ruleset listing; entries carry id and name but not the full rule body.
    async fn list_repo_rulesets(&self, org: &str, repo: &str) -> GitHubResult<Vec<RepoRuleset>>;

    /// Full form of a single ruleset.
    async fn get_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> GitHubResult<RepoRuleset>;

    async fn create_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()>;

    async fn update_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset_id: i64,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()>;

    async fn delete_repo_ruleset(&self, org: &str, repo: &str, ruleset_id: i64)
        -> GitHubResult<()>;

    // --- content, releases, checks, gists ---

    /// File content at a ref, undecoded.
    async fn get_file_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> GitHubResult<ContentFile>;

    async fn get_release_by_tag(
        &self,
        org: &str,
        repo: &str,
        tag: &str,
    ) -> GitHubResult<Option<Release>>;

    async fn get_pull_request(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> GitHubResult<PullRequest>;

    async fn create_check_run(
        &self,
        org: &str,
        repo: &str,
        check: &CheckRunInput,
    ) -> GitHubResult<()>;

    /// Create a secret gist with one file; returns the raw content URL.
    async fn create_gist(&self, file_name: &str, content: &str) -> GitHubResult<CreatedGist>;
}
