//! Minimal platform stub for webhook engine tests.
//!
//! Only the operations the enforcement paths touch are backed by state;
//! everything else answers with an API error so an unexpected call fails
//! the test loudly instead of silently passing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sheriff_github::client::{DynGitHubClient, GitHubClient};
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::error::{GitHubError, GitHubResult};
use sheriff_github::types::{
    CheckRunInput, Collaborator, ContentFile, CreatedGist, CustomPropertySchema,
    CustomPropertyValue, GitHubRepository, GitHubTeam, GitHubUser, NewRepository, NewTeam,
    OrgInvitation, PullRequest, Release, RepoInvitation, RepoPatch, RepoRuleset, TeamPatch,
    TeamRole,
};

fn unsupported(method: &str) -> GitHubError {
    GitHubError::Api {
        status: 0,
        message: format!("{method} is not backed by the webhook test stub"),
    }
}

#[derive(Default)]
pub struct StubState {
    /// Served as the remote permissions file.
    pub config_yaml: String,
    pub owners: Vec<GitHubUser>,
    /// repo → direct collaborators.
    pub collaborators: HashMap<String, Vec<Collaborator>>,
    /// repo → releases.
    pub releases: HashMap<String, Vec<Release>>,
    /// PR number → poll responses, served in order (last one repeats).
    pub pull_requests: HashMap<u64, Vec<PullRequest>>,
}

pub struct StubGitHub {
    pub state: Mutex<StubState>,
    pub mutations: Mutex<Vec<String>>,
    pub checks: Mutex<Vec<CheckRunInput>>,
}

impl StubGitHub {
    pub fn new(state: StubState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            mutations: Mutex::new(Vec::new()),
            checks: Mutex::new(Vec::new()),
        })
    }

    pub async fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().await.clone()
    }
}

pub struct StubProvider {
    pub client: Arc<StubGitHub>,
}

#[async_trait]
impl CredentialProvider for StubProvider {
    async fn client_for_org(&self, _org: &str, _read_only: bool) -> GitHubResult<DynGitHubClient> {
        Ok(Arc::clone(&self.client) as DynGitHubClient)
    }

    fn dry_run(&self) -> bool {
        false
    }
}

#[async_trait]
impl GitHubClient for StubGitHub {
    async fn list_org_members(&self, _org: &str) -> GitHubResult<Vec<GitHubUser>> {
        Err(unsupported("list_org_members"))
    }

    async fn list_org_owners(&self, _org: &str) -> GitHubResult<Vec<GitHubUser>> {
        Ok(self.state.lock().await.owners.clone())
    }

    async fn list_org_invitations(&self, _org: &str) -> GitHubResult<Vec<OrgInvitation>> {
        Err(unsupported("list_org_invitations"))
    }

    async fn create_org_invitation(&self, _org: &str, _user_id: i64) -> GitHubResult<()> {
        Err(unsupported("create_org_invitation"))
    }

    async fn get_user(&self, login: &str) -> GitHubResult<GitHubUser> {
        Err(GitHubError::not_found("user", login))
    }

    async fn list_custom_properties(&self, _org: &str) -> GitHubResult<Vec<CustomPropertySchema>> {
        Err(unsupported("list_custom_properties"))
    }

    async fn upsert_custom_property(
        &self,
        _org: &str,
        _schema: &CustomPropertySchema,
    ) -> GitHubResult<()> {
        Err(unsupported("upsert_custom_property"))
    }

    async fn delete_custom_property(&self, _org: &str, _property_name: &str) -> GitHubResult<()> {
        Err(unsupported("delete_custom_property"))
    }

    async fn get_repo_properties(
        &self,
        _org: &str,
        _repo: &str,
    ) -> GitHubResult<Vec<CustomPropertyValue>> {
        Err(unsupported("get_repo_properties"))
    }

    async fn set_repo_properties(
        &self,
        _org: &str,
        _repo: &str,
        _values: &[CustomPropertyValue],
    ) -> GitHubResult<()> {
        Err(unsupported("set_repo_properties"))
    }

    async fn list_teams(&self, _org: &str) -> GitHubResult<Vec<GitHubTeam>> {
        Err(unsupported("list_teams"))
    }

    async fn create_team(&self, _org: &str, _team: &NewTeam) -> GitHubResult<GitHubTeam> {
        Err(unsupported("create_team"))
    }

    async fn update_team(&self, _org: &str, _slug: &str, _patch: &TeamPatch) -> GitHubResult<()> {
        Err(unsupported("update_team"))
    }

    async fn delete_team(&self, _org: &str, _slug: &str) -> GitHubResult<()> {
        Err(unsupported("delete_team"))
    }

    async fn team_members_by_role(
        &self,
        _org: &str,
        _slug: &str,
        _role: TeamRole,
    ) -> GitHubResult<Vec<String>> {
        Err(unsupported("team_members_by_role"))
    }

    async fn put_team_membership(
        &self,
        _org: &str,
        _slug: &str,
        _login: &str,
        _role: TeamRole,
    ) -> GitHubResult<()> {
        Err(unsupported("put_team_membership"))
    }

    async fn remove_team_membership(
        &self,
        _org: &str,
        _slug: &str,
        _login: &str,
    ) -> GitHubResult<()> {
        Err(unsupported("remove_team_membership"))
    }

    async fn list_repos(&self, _org: &str) -> GitHubResult<Vec<GitHubRepository>> {
        Err(unsupported("list_repos"))
    }

    async fn get_repo(&self, _org: &str, repo: &str) -> GitHubResult<GitHubRepository> {
        Err(GitHubError::not_found("repository", repo))
    }

    async fn create_repo(
        &self,
        _org: &str,
        _repo: &NewRepository,
    ) -> GitHubResult<GitHubRepository> {
        Err(unsupported("create_repo"))
    }

    async fn update_repo(&self, _org: &str, _repo: &str, _patch: &RepoPatch) -> GitHubResult<()> {
        Err(unsupported("update_repo"))
    }

    async fn list_repo_teams(&self, _org: &str, _repo: &str) -> GitHubResult<Vec<GitHubTeam>> {
        Err(unsupported("list_repo_teams"))
    }

    async fn put_team_repo_permission(
        &self,
        _org: &str,
        _team_slug: &str,
        _repo: &str,
        _permission: &str,
    ) -> GitHubResult<()> {
        Err(unsupported("put_team_repo_permission"))
    }

    async fn remove_team_from_repo(
        &self,
        _org: &str,
        _team_slug: &str,
        _repo: &str,
    ) -> GitHubResult<()> {
        Err(unsupported("remove_team_from_repo"))
    }

    async fn list_direct_collaborators(
        &self,
        _org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<Collaborator>> {
        Ok(self
            .state
            .lock()
            .await
            .collaborators
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_collaborator(
        &self,
        _org: &str,
        repo: &str,
        login: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.mutations
            .lock()
            .await
            .push(format!("add_collaborator {repo} {login} {permission}"));
        Ok(())
    }

    async fn remove_collaborator(&self, _org: &str, repo: &str, login: &str) -> GitHubResult<()> {
        self.mutations
            .lock()
            .await
            .push(format!("remove_collaborator {repo} {login}"));
        Ok(())
    }

    async fn list_repo_invitations(
        &self,
        _org: &str,
        _repo: &str,
    ) -> GitHubResult<Vec<RepoInvitation>> {
        Err(unsupported("list_repo_invitations"))
    }

    async fn update_repo_invitation(
        &self,
        _org: &str,
        _repo: &str,
        _invitation_id: i64,
        _permission: &str,
    ) -> GitHubResult<()> {
        Err(unsupported("update_repo_invitation"))
    }

    async fn delete_repo_invitation(
        &self,
        _org: &str,
        _repo: &str,
        _invitation_id: i64,
    ) -> GitHubResult<()> {
        Err(unsupported("delete_repo_invitation"))
    }

    async fn get_fork_pr_approval_policy(&self, _org: &str, _repo: &str) -> GitHubResult<String> {
        Err(unsupported("get_fork_pr_approval_policy"))
    }

    async fn set_fork_pr_approval_policy(
        &self,
        _org: &str,
        _repo: &str,
        _policy: &str,
    ) -> GitHubResult<()> {
        Err(unsupported("set_fork_pr_approval_policy"))
    }

    async fn list_repo_rulesets(&self, _org: &str, _repo: &str) -> GitHubResult<Vec<RepoRuleset>> {
        Err(unsupported("list_repo_rulesets"))
    }

    async fn get_repo_ruleset(
        &self,
        _org: &str,
        _repo: &str,
        _ruleset_id: i64,
    ) -> GitHubResult<RepoRuleset> {
        Err(unsupported("get_repo_ruleset"))
    }

    async fn create_repo_ruleset(
        &self,
        _org: &str,
        _repo: &str,
        _ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        Err(unsupported("create_repo_ruleset"))
    }

    async fn update_repo_ruleset(
        &self,
        _org: &str,
        _repo: &str,
        _ruleset_id: i64,
        _ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        Err(unsupported("update_repo_ruleset"))
    }

    async fn delete_repo_ruleset(
        &self,
        _org: &str,
        _repo: &str,
        _ruleset_id: i64,
    ) -> GitHubResult<()> {
        Err(unsupported("delete_repo_ruleset"))
    }

    async fn get_file_content(
        &self,
        _org: &str,
        _repo: &str,
        _path: &str,
        _git_ref: &str,
    ) -> GitHubResult<ContentFile> {
        let yaml = self.state.lock().await.config_yaml.clone();
        if yaml.is_empty() {
            return Err(GitHubError::not_found("file", "config.yaml"));
        }
        Ok(ContentFile {
            content: yaml,
            encoding: "utf-8".to_string(),
        })
    }

    async fn get_release_by_tag(
        &self,
        _org: &str,
        repo: &str,
        tag: &str,
    ) -> GitHubResult<Option<Release>> {
        Ok(self
            .state
            .lock()
            .await
            .releases
            .get(repo)
            .and_then(|releases| releases.iter().find(|r| r.tag_name == tag))
            .cloned())
    }

    async fn get_pull_request(
        &self,
        _org: &str,
        _repo: &str,
        number: u64,
    ) -> GitHubResult<PullRequest> {
        let mut state = self.state.lock().await;
        let responses = state
            .pull_requests
            .get_mut(&number)
            .ok_or_else(|| GitHubError::not_found("pull request", number.to_string()))?;
        if responses.len() > 1 {
            Ok(responses.remove(0))
        } else {
            responses
                .first()
                .cloned()
                .ok_or_else(|| GitHubError::not_found("pull request", number.to_string()))
        }
    }

    async fn create_check_run(
        &self,
        _org: &str,
        _repo: &str,
        check: &CheckRunInput,
    ) -> GitHubResult<()> {
        self.checks.lock().await.push(check.clone());
        Ok(())
    }

    async fn create_gist(&self, _file_name: &str, _content: &str) -> GitHubResult<CreatedGist> {
        Ok(CreatedGist {
            id: "gist-1".to_string(),
            raw_url: "https://gist.example/raw/dry-run.svg".to_string(),
        })
    }
}
