//! reqwest-backed [`GitHubClient`] implementation.
//!
//! The client is deliberately thin: typed wrappers over the REST endpoints
//! plus the one GraphQL query the membership sync needs. Retry and backoff
//! for rate limits live in the shared HTTP stack, not here.

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::GitHubClient;
use crate::error::{GitHubError, GitHubResult};
use crate::types::{
    CheckRunInput, Collaborator, ContentFile, CreatedGist, CustomPropertySchema,
    CustomPropertyValue, GitHubRepository, GitHubTeam, GitHubUser, NewRepository, NewTeam,
    OrgInvitation, PullRequest, Release, RepoInvitation, RepoPatch, RepoRuleset, TeamPatch,
    TeamRole,
};

const DEFAULT_API_URL: &str = "https://api.github.com";
const PER_PAGE: usize = 100;

/// Configuration for a [`RestClient`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: String,
    pub token: String,
    pub read_only: bool,
}

impl RestConfig {
    /// Config against the public API.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: token.into(),
            read_only: false,
        }
    }

    /// Point the client at a different API root (tests, GHES).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Refuse every mutating call at the transport seam.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

/// Typed REST client for the GitHub API.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    read_only: bool,
}

impl RestClient {
    pub fn new(config: RestConfig) -> GitHubResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("sheriff")
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            read_only: config.read_only,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(header::ACCEPT, "application/vnd.github+json")
    }

    fn ensure_writable(&self, org: &str) -> GitHubResult<()> {
        if self.read_only {
            return Err(GitHubError::ReadOnly {
                org: org.to_string(),
            });
        }
        Ok(())
    }

    async fn check(response: Response) -> GitHubResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let body = response.text().await.unwrap_or_default();

        Err(match status {
            StatusCode::UNAUTHORIZED => GitHubError::AuthExpired(body),
            StatusCode::FORBIDDEN if rate_limited => GitHubError::RateLimited(body),
            StatusCode::FORBIDDEN => GitHubError::AuthInsufficient(body),
            StatusCode::NOT_FOUND => GitHubError::NotFound {
                resource: "entity".to_string(),
                id: None,
            },
            _ => GitHubError::Api {
                status: status.as_u16(),
                message: body,
            },
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<T> {
        let response = Self::check(self.request(Method::GET, path).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Drain a paginated listing endpoint.
    async fn get_paginated<T: DeserializeOwned>(&self, path: &str) -> GitHubResult<Vec<T>> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1usize;
        loop {
            let url = format!("{path}{sep}per_page={PER_PAGE}&page={page}");
            let batch: Vec<T> = self.get_json(&url).await?;
            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                return Ok(items);
            }
            page += 1;
        }
    }

    async fn send_mutation(
        &self,
        org: &str,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> GitHubResult<Response> {
        self.ensure_writable(org)?;
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Self::check(request.send().await?).await
    }
}

#[async_trait]
impl GitHubClient for RestClient {
    async fn list_org_members(&self, org: &str) -> GitHubResult<Vec<GitHubUser>> {
        self.get_paginated(&format!("/orgs/{org}/members")).await
    }

    async fn list_org_owners(&self, org: &str) -> GitHubResult<Vec<GitHubUser>> {
        self.get_paginated(&format!("/orgs/{org}/members?role=admin"))
            .await
    }

    async fn list_org_invitations(&self, org: &str) -> GitHubResult<Vec<OrgInvitation>> {
        self.get_paginated(&format!("/orgs/{org}/invitations")).await
    }

    async fn create_org_invitation(&self, org: &str, user_id: i64) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::POST,
            &format!("/orgs/{org}/invitations"),
            Some(json!({ "invitee_id": user_id, "role": "direct_member" })),
        )
        .await?;
        Ok(())
    }

    async fn get_user(&self, login: &str) -> GitHubResult<GitHubUser> {
        self.get_json(&format!("/users/{login}")).await
    }

    async fn list_custom_properties(&self, org: &str) -> GitHubResult<Vec<CustomPropertySchema>> {
        self.get_json(&format!("/orgs/{org}/properties/schema")).await
    }

    async fn upsert_custom_property(
        &self,
        org: &str,
        schema: &CustomPropertySchema,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/orgs/{org}/properties/schema/{}", schema.property_name),
            Some(serde_json::to_value(schema)?),
        )
        .await?;
        Ok(())
    }

    async fn delete_custom_property(&self, org: &str, property_name: &str) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/orgs/{org}/properties/schema/{property_name}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get_repo_properties(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<CustomPropertyValue>> {
        self.get_json(&format!("/repos/{org}/{repo}/properties/values"))
            .await
    }

    async fn set_repo_properties(
        &self,
        org: &str,
        repo: &str,
        values: &[CustomPropertyValue],
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PATCH,
            &format!("/repos/{org}/{repo}/properties/values"),
            Some(json!({ "properties": values })),
        )
        .await?;
        Ok(())
    }

    async fn list_teams(&self, org: &str) -> GitHubResult<Vec<GitHubTeam>> {
        self.get_paginated(&format!("/orgs/{org}/teams")).await
    }

    async fn create_team(&self, org: &str, team: &NewTeam) -> GitHubResult<GitHubTeam> {
        let response = self
            .send_mutation(
                org,
                Method::POST,
                &format!("/orgs/{org}/teams"),
                Some(serde_json::to_value(team)?),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn update_team(&self, org: &str, slug: &str, patch: &TeamPatch) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PATCH,
            &format!("/orgs/{org}/teams/{slug}"),
            Some(serde_json::to_value(patch)?),
        )
        .await?;
        Ok(())
    }

    async fn delete_team(&self, org: &str, slug: &str) -> GitHubResult<()> {
        self.send_mutation(org, Method::DELETE, &format!("/orgs/{org}/teams/{slug}"), None)
            .await?;
        Ok(())
    }

    async fn team_members_by_role(
        &self,
        org: &str,
        slug: &str,
        role: TeamRole,
    ) -> GitHubResult<Vec<String>> {
        let role_token = match role {
            TeamRole::Member => "MEMBER",
            TeamRole::Maintainer => "MAINTAINER",
        };
        let query = r"
            query($org: String!, $slug: String!, $role: TeamMemberRole!) {
                organization(login: $org) {
                    team(slug: $slug) {
                        members(first: 100, membership: IMMEDIATE, role: $role) {
                            nodes { login }
                        }
                    }
                }
            }";
        let response = Self::check(
            self.request(Method::POST, "/graphql")
                .json(&json!({
                    "query": query,
                    "variables": { "org": org, "slug": slug, "role": role_token },
                }))
                .send()
                .await?,
        )
        .await?;

        let body: serde_json::Value = response.json().await?;
        let nodes = body
            .pointer("/data/organization/team/members/nodes")
            .and_then(|v| v.as_array())
            .ok_or_else(|| GitHubError::not_found("team", format!("{org}/{slug}")))?;
        Ok(nodes
            .iter()
            .filter_map(|n| n.get("login").and_then(|l| l.as_str()))
            .map(str::to_string)
            .collect())
    }

    async fn put_team_membership(
        &self,
        org: &str,
        slug: &str,
        login: &str,
        role: TeamRole,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/orgs/{org}/teams/{slug}/memberships/{login}"),
            Some(json!({ "role": role.to_string() })),
        )
        .await?;
        Ok(())
    }

    async fn remove_team_membership(&self, org: &str, slug: &str, login: &str) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/orgs/{org}/teams/{slug}/memberships/{login}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_repos(&self, org: &str) -> GitHubResult<Vec<GitHubRepository>> {
        self.get_paginated(&format!("/orgs/{org}/repos")).await
    }

    async fn get_repo(&self, org: &str, repo: &str) -> GitHubResult<GitHubRepository> {
        self.get_json(&format!("/repos/{org}/{repo}")).await
    }

    async fn create_repo(&self, org: &str, repo: &NewRepository) -> GitHubResult<GitHubRepository> {
        let response = self
            .send_mutation(
                org,
                Method::POST,
                &format!("/orgs/{org}/repos"),
                Some(serde_json::to_value(repo)?),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn update_repo(&self, org: &str, repo: &str, patch: &RepoPatch) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PATCH,
            &format!("/repos/{org}/{repo}"),
            Some(serde_json::to_value(patch)?),
        )
        .await?;
        Ok(())
    }

    async fn list_repo_teams(&self, org: &str, repo: &str) -> GitHubResult<Vec<GitHubTeam>> {
        self.get_paginated(&format!("/repos/{org}/{repo}/teams"))
            .await
    }

    async fn put_team_repo_permission(
        &self,
        org: &str,
        team_slug: &str,
        repo: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/orgs/{org}/teams/{team_slug}/repos/{org}/{repo}"),
            Some(json!({ "permission": permission })),
        )
        .await?;
        Ok(())
    }

    async fn remove_team_from_repo(
        &self,
        org: &str,
        team_slug: &str,
        repo: &str,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/orgs/{org}/teams/{team_slug}/repos/{org}/{repo}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_direct_collaborators(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<Collaborator>> {
        self.get_paginated(&format!(
            "/repos/{org}/{repo}/collaborators?affiliation=direct"
        ))
        .await
    }

    async fn add_collaborator(
        &self,
        org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/repos/{org}/{repo}/collaborators/{login}"),
            Some(json!({ "permission": permission })),
        )
        .await?;
        Ok(())
    }

    async fn remove_collaborator(&self, org: &str, repo: &str, login: &str) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/repos/{org}/{repo}/collaborators/{login}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn list_repo_invitations(
        &self,
        org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<RepoInvitation>> {
        self.get_paginated(&format!("/repos/{org}/{repo}/invitations"))
            .await
    }

    async fn update_repo_invitation(
        &self,
        org: &str,
        repo: &str,
        invitation_id: i64,
        permission: &str,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PATCH,
            &format!("/repos/{org}/{repo}/invitations/{invitation_id}"),
            Some(json!({ "permissions": permission })),
        )
        .await?;
        Ok(())
    }

    async fn delete_repo_invitation(
        &self,
        org: &str,
        repo: &str,
        invitation_id: i64,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/repos/{org}/{repo}/invitations/{invitation_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get_fork_pr_approval_policy(&self, org: &str, repo: &str) -> GitHubResult<String> {
        #[derive(serde::Deserialize)]
        struct Policy {
            approval_policy: String,
        }
        let policy: Policy = self
            .get_json(&format!(
                "/repos/{org}/{repo}/actions/permissions/fork-pr-contributor-approval"
            ))
            .await?;
        Ok(policy.approval_policy)
    }

    async fn set_fork_pr_approval_policy(
        &self,
        org: &str,
        repo: &str,
        policy: &str,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/repos/{org}/{repo}/actions/permissions/fork-pr-contributor-approval"),
            Some(json!({ "approval_policy": policy })),
        )
        .await?;
        Ok(())
    }

    async fn list_repo_rulesets(&self, org: &str, repo: &str) -> GitHubResult<Vec<RepoRuleset>> {
        self.get_paginated(&format!(
            "/repos/{org}/{repo}/rulesets?includes_parents=false"
        ))
        .await
    }

    async fn get_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> GitHubResult<RepoRuleset> {
        self.get_json(&format!("/repos/{org}/{repo}/rulesets/{ruleset_id}"))
            .await
    }

    async fn create_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::POST,
            &format!("/repos/{org}/{repo}/rulesets"),
            Some(serde_json::to_value(ruleset)?),
        )
        .await?;
        Ok(())
    }

    async fn update_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset_id: i64,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::PUT,
            &format!("/repos/{org}/{repo}/rulesets/{ruleset_id}"),
            Some(serde_json::to_value(ruleset)?),
        )
        .await?;
        Ok(())
    }

    async fn delete_repo_ruleset(
        &self,
        org: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::DELETE,
            &format!("/repos/{org}/{repo}/rulesets/{ruleset_id}"),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get_file_content(
        &self,
        org: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> GitHubResult<ContentFile> {
        self.get_json(&format!(
            "/repos/{org}/{repo}/contents/{path}?ref={git_ref}"
        ))
        .await
    }

    async fn get_release_by_tag(
        &self,
        org: &str,
        repo: &str,
        tag: &str,
    ) -> GitHubResult<Option<Release>> {
        match self
            .get_json(&format!("/repos/{org}/{repo}/releases/tags/{tag}"))
            .await
        {
            Ok(release) => Ok(Some(release)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_pull_request(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> GitHubResult<PullRequest> {
        self.get_json(&format!("/repos/{org}/{repo}/pulls/{number}"))
            .await
    }

    async fn create_check_run(
        &self,
        org: &str,
        repo: &str,
        check: &CheckRunInput,
    ) -> GitHubResult<()> {
        self.send_mutation(
            org,
            Method::POST,
            &format!("/repos/{org}/{repo}/check-runs"),
            Some(serde_json::to_value(check)?),
        )
        .await?;
        Ok(())
    }

    async fn create_gist(&self, file_name: &str, content: &str) -> GitHubResult<CreatedGist> {
        if self.read_only {
            return Err(GitHubError::ReadOnly {
                org: "gist".to_string(),
            });
        }
        let response = Self::check(
            self.request(Method::POST, "/gists")
                .json(&json!({
                    "public": false,
                    "files": { file_name: { "content": content } },
                }))
                .send()
                .await?,
        )
        .await?;

        let body: serde_json::Value = response.json().await?;
        let id = body
            .get("id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let raw_url = body
            .pointer(&format!("/files/{file_name}/raw_url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| GitHubError::Api {
                status: 201,
                message: "gist response missing raw_url".to_string(),
            })?
            .to_string();
        Ok(CreatedGist { id, raw_url })
    }
}
