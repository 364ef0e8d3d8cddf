//! Webhook payload shapes, reduced to the fields the engine reads.

use serde::Deserialize;
use sheriff_github::types::GitHubUser;

/// Repository object embedded in webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct EventRepository {
    pub name: String,
    pub owner: GitHubUser,
    #[serde(default)]
    pub private: bool,
}

impl EventRepository {
    /// `owner/name` for narration.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner.login, self.name)
    }
}

/// `delete` — a branch or tag was deleted.
#[derive(Debug, Clone, Deserialize)]
pub struct DeletePayload {
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// `branch` or `tag`.
    pub ref_type: String,
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

/// `deploy_key` — a deploy key was added or removed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployKeyPayload {
    pub action: String,
    pub key: DeployKey,
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeployKey {
    pub title: String,
    pub read_only: bool,
}

/// `member` — a collaborator was added, edited or removed.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberPayload {
    pub action: String,
    pub member: GitHubUser,
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

/// `meta` — the webhook itself changed.
#[derive(Debug, Clone, Deserialize)]
pub struct MetaPayload {
    pub action: String,
    #[serde(default)]
    pub repository: Option<EventRepository>,
    #[serde(default)]
    pub sender: Option<GitHubUser>,
}

/// `organization` — org membership changed.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationPayload {
    pub action: String,
    #[serde(default)]
    pub membership: Option<OrgMembership>,
    #[serde(default)]
    pub invitation: Option<OrgInvitationInfo>,
    pub sender: GitHubUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgMembership {
    pub user: GitHubUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgInvitationInfo {
    #[serde(default)]
    pub login: Option<String>,
}

/// `repository` — repo lifecycle events.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    pub action: String,
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

/// `public` — a private repo went public.
#[derive(Debug, Clone, Deserialize)]
pub struct PublicPayload {
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

/// `release` — release lifecycle events.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleasePayload {
    pub action: String,
    pub release: ReleaseInfo,
    pub repository: EventRepository,
    pub sender: GitHubUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `personal_access_token_request` — fine-grained PAT lifecycle.
#[derive(Debug, Clone, Deserialize)]
pub struct PatRequestPayload {
    pub action: String,
    pub personal_access_token_request: PatRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatRequest {
    pub owner: GitHubUser,
}

/// `pull_request` — only opened/synchronize on the config repo matter.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestPayload {
    pub action: String,
    pub number: u64,
    pub pull_request: PullRequestInfo,
    pub repository: EventRepository,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub head: CommitInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
}
