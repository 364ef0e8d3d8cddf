//! In-memory platform fake for reconciler scenario tests.
//!
//! Read methods serve from the seeded state; mutating methods append a
//! one-line record to the mutation log and update the state so follow-up
//! reads observe the change. Assertions run against the log and the
//! recorded alert messages.

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
    OrgInvitation, PermissionFlags, PullRequest, Release, RepoInvitation, RepoPatch, RepoRuleset,
    TeamPatch, TeamRole,
};
use sheriff_github::AccessLevel;

#[derive(Default)]
pub struct OrgState {
    pub users: Vec<GitHubUser>,
    pub members: Vec<GitHubUser>,
    pub owners: Vec<GitHubUser>,
    pub org_invitations: Vec<OrgInvitation>,
    pub teams: Vec<GitHubTeam>,
    /// slug → login → role
    pub team_members: HashMap<String, HashMap<String, TeamRole>>,
    pub repos: Vec<GitHubRepository>,
    pub repo_teams: HashMap<String, Vec<GitHubTeam>>,
    pub repo_collaborators: HashMap<String, Vec<Collaborator>>,
    pub repo_invitations: HashMap<String, Vec<RepoInvitation>>,
    pub repo_properties: HashMap<String, Vec<CustomPropertyValue>>,
    pub repo_rulesets: HashMap<String, Vec<RepoRuleset>>,
    pub approval_policies: HashMap<String, String>,
    pub custom_properties: Vec<CustomPropertySchema>,
    pub releases: HashMap<String, Vec<Release>>,
    next_id: i64,
}

impl OrgState {
    pub fn user(id: i64, login: &str) -> GitHubUser {
        GitHubUser {
            id,
            login: login.to_string(),
            avatar_url: None,
        }
    }

    /// Seed a user who is an org member.
    pub fn add_member(&mut self, id: i64, login: &str) {
        let user = Self::user(id, login);
        self.users.push(user.clone());
        self.members.push(user);
    }

    /// Seed a platform user who is not in the org.
    pub fn add_user(&mut self, id: i64, login: &str) {
        self.users.push(Self::user(id, login));
    }

    pub fn add_team(&mut self, id: i64, name: &str) -> String {
        let slug = name.to_lowercase().replace(' ', "-");
        self.teams.push(GitHubTeam {
            id,
            name: name.to_string(),
            slug: slug.clone(),
            privacy: "closed".to_string(),
            parent: None,
            permissions: None,
        });
        slug
    }

    pub fn add_repo(&mut self, id: i64, name: &str) {
        self.repos.push(GitHubRepository {
            id,
            name: name.to_string(),
            private: false,
            archived: false,
            has_wiki: false,
            stargazers_count: Some(0),
            owner: None,
        });
    }

    pub fn set_team_role(&mut self, slug: &str, login: &str, role: TeamRole) {
        self.team_members
            .entry(slug.to_string())
            .or_default()
            .insert(login.to_string(), role);
    }

    pub fn attach_team_to_repo(&mut self, repo: &str, team_id: i64, name: &str, level: AccessLevel) {
        let slug = name.to_lowercase().replace(' ', "-");
        self.repo_teams.entry(repo.to_string()).or_default().push(GitHubTeam {
            id: team_id,
            name: name.to_string(),
            slug,
            privacy: "closed".to_string(),
            parent: None,
            permissions: Some(PermissionFlags::from_level(level)),
        });
    }

    pub fn add_collaborator(&mut self, repo: &str, id: i64, login: &str, level: AccessLevel) {
        self.repo_collaborators
            .entry(repo.to_string())
            .or_default()
            .push(Collaborator {
                id,
                login: login.to_string(),
                permissions: PermissionFlags::from_level(level),
            });
    }

    fn fresh_id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

pub struct FakeGitHub {
    pub state: Mutex<OrgState>,
    pub mutations: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn new(state: OrgState) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            mutations: Mutex::new(Vec::new()),
        })
    }

    pub async fn mutation_log(&self) -> Vec<String> {
        self.mutations.lock().await.clone()
    }

    async fn record(&self, line: String) {
        self.mutations.lock().await.push(line);
    }
}

/// Provider handing the same fake to every caller.
pub struct FakeProvider {
    pub client: Arc<FakeGitHub>,
    pub dry_run: bool,
}

#[async_trait]
impl CredentialProvider for FakeProvider {
    async fn client_for_org(&self, _org: &str, _read_only: bool) -> GitHubResult<DynGitHubClient> {
        Ok(self.client.clone() as DynGitHubClient)
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}

#[async_trait]
impl GitHubClient for FakeGitHub {
    async fn list_org_members(&self, _org: &str) -> GitHubResult<Vec<GitHubUser>> {
        Ok(self.state.lock().await.members.clone())
    }

    async fn list_org_owners(&self, _org: &str) -> GitHubResult<Vec<GitHubUser>> {
        Ok(self.state.lock().await.owners.clone())
    }

    async fn list_org_invitations(&self, _org: &str) -> GitHubResult<Vec<OrgInvitation>> {
        Ok(self.state.lock().await.org_invitations.clone())
    }

    async fn create_org_invitation(&self, _org: &str, user_id: i64) -> GitHubResult<()> {
        self.record(format!("create_org_invitation {user_id}")).await;
        let mut state = self.state.lock().await;
        let login = state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.login.clone());
        let id = state.fresh_id();
        state.org_invitations.push(OrgInvitation {
            id,
            login,
            role: "direct_member".to_string(),
        });
        Ok(())
    }

    async fn get_user(&self, login: &str) -> GitHubResult<GitHubUser> {
        self.state
            .lock()
            .await
            .users
            .iter()
            .find(|u| u.login.eq_ignore_ascii_case(login))
            .cloned()
            .ok_or_else(|| GitHubError::not_found("user", login))
    }

    async fn list_custom_properties(&self, _org: &str) -> GitHubResult<Vec<CustomPropertySchema>> {
        Ok(self.state.lock().await.custom_properties.clone())
    }

    async fn upsert_custom_property(
        &self,
        _org: &str,
        schema: &CustomPropertySchema,
    ) -> GitHubResult<()> {
        self.record(format!("upsert_custom_property {}", schema.property_name))
            .await;
        let mut state = self.state.lock().await;
        state
            .custom_properties
            .retain(|p| p.property_name != schema.property_name);
        state.custom_properties.push(schema.clone());
        Ok(())
    }

    async fn delete_custom_property(&self, _org: &str, property_name: &str) -> GitHubResult<()> {
        self.record(format!("delete_custom_property {property_name}")).await;
        let mut state = self.state.lock().await;
        state.custom_properties.retain(|p| p.property_name != property_name);
        Ok(())
    }

    async fn get_repo_properties(
        &self,
        _org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<CustomPropertyValue>> {
        Ok(self
            .state
            .lock()
            .await
            .repo_properties
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_repo_properties(
        &self,
        _org: &str,
        repo: &str,
        values: &[CustomPropertyValue],
    ) -> GitHubResult<()> {
        self.record(format!("set_repo_properties {repo}")).await;
        self.state
            .lock()
            .await
            .repo_properties
            .insert(repo.to_string(), values.to_vec());
        Ok(())
    }

    async fn list_teams(&self, _org: &str) -> GitHubResult<Vec<GitHubTeam>> {
        Ok(self.state.lock().await.teams.clone())
    }

    async fn create_team(&self, _org: &str, team: &NewTeam) -> GitHubResult<GitHubTeam> {
        self.record(format!("create_team {}", team.name)).await;
        let mut state = self.state.lock().await;
        let id = state.fresh_id();
        let created = GitHubTeam {
            id,
            name: team.name.clone(),
            slug: team.name.to_lowercase().replace(' ', "-"),
            privacy: team.privacy.clone(),
            parent: None,
            permissions: None,
        };
        state.teams.push(created.clone());
        let members = state.team_members.entry(created.slug.clone()).or_default();
        for login in &team.maintainers {
            members.insert(login.clone(), TeamRole::Maintainer);
        }
        Ok(created)
    }

    async fn update_team(&self, _org: &str, slug: &str, patch: &TeamPatch) -> GitHubResult<()> {
        self.record(format!(
            "update_team {slug} privacy={:?} parent={:?}",
            patch.privacy, patch.parent_team_id
        ))
        .await;
        Ok(())
    }

    async fn delete_team(&self, _org: &str, slug: &str) -> GitHubResult<()> {
        self.record(format!("delete_team {slug}")).await;
        let mut state = self.state.lock().await;
        state.teams.retain(|t| t.slug != slug);
        Ok(())
    }

    async fn team_members_by_role(
        &self,
        _org: &str,
        slug: &str,
        role: TeamRole,
    ) -> GitHubResult<Vec<String>> {
        Ok(self
            .state
            .lock()
            .await
            .team_members
            .get(slug)
            .map(|members| {
                members
                    .iter()
                    .filter(|(_, r)| **r == role)
                    .map(|(login, _)| login.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn put_team_membership(
        &self,
        _org: &str,
        slug: &str,
        login: &str,
        role: TeamRole,
    ) -> GitHubResult<()> {
        self.record(format!("put_team_membership {slug} {login} {role}")).await;
        self.state
            .lock()
            .await
            .team_members
            .entry(slug.to_string())
            .or_default()
            .insert(login.to_string(), role);
        Ok(())
    }

    async fn remove_team_membership(
        &self,
        _org: &str,
        slug: &str,
        login: &str,
    ) -> GitHubResult<()> {
        self.record(format!("remove_team_membership {slug} {login}")).await;
        if let Some(members) = self.state.lock().await.team_members.get_mut(slug) {
            members.remove(login);
        }
        Ok(())
    }

    async fn list_repos(&self, _org: &str) -> GitHubResult<Vec<GitHubRepository>> {
        Ok(self.state.lock().await.repos.clone())
    }

    async fn get_repo(&self, _org: &str, repo: &str) -> GitHubResult<GitHubRepository> {
        self.state
            .lock()
            .await
            .repos
            .iter()
            .find(|r| r.name == repo)
            .cloned()
            .ok_or_else(|| GitHubError::not_found("repository", repo))
    }

    async fn create_repo(
        &self,
        _org: &str,
        repo: &NewRepository,
    ) -> GitHubResult<GitHubRepository> {
        self.record(format!("create_repo {}", repo.name)).await;
        let mut state = self.state.lock().await;
        let id = state.fresh_id();
        let created = GitHubRepository {
            id,
            name: repo.name.clone(),
            private: repo.private.unwrap_or(false),
            archived: false,
            has_wiki: repo.has_wiki,
            stargazers_count: Some(0),
            owner: None,
        };
        state.repos.push(created.clone());
        Ok(created)
    }

    async fn update_repo(&self, _org: &str, repo: &str, patch: &RepoPatch) -> GitHubResult<()> {
        self.record(format!(
            "update_repo {repo} has_wiki={:?} private={:?}",
            patch.has_wiki, patch.private
        ))
        .await;
        let mut state = self.state.lock().await;
        if let Some(observed) = state.repos.iter_mut().find(|r| r.name == repo) {
            if let Some(has_wiki) = patch.has_wiki {
                observed.has_wiki = has_wiki;
            }
            if let Some(private) = patch.private {
                observed.private = private;
            }
        }
        Ok(())
    }

    async fn list_repo_teams(&self, _org: &str, repo: &str) -> GitHubResult<Vec<GitHubTeam>> {
        Ok(self
            .state
            .lock()
            .await
            .repo_teams
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_team_repo_permission(
        &self,
        _org: &str,
        team_slug: &str,
        repo: &str,
        permission: &str,
    ) -> GitHubResult<()> {
        self.record(format!("put_team_repo_permission {team_slug} {repo} {permission}"))
            .await;
        Ok(())
    }

    async fn remove_team_from_repo(
        &self,
        _org: &str,
        team_slug: &str,
        repo: &str,
    ) -> GitHubResult<()> {
        self.record(format!("remove_team_from_repo {team_slug} {repo}")).await;
        if let Some(teams) = self.state.lock().await.repo_teams.get_mut(repo) {
            teams.retain(|t| t.slug != team_slug);
        }
        Ok(())
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
            .repo_collaborators
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
        self.record(format!("add_collaborator {repo} {login} {permission}")).await;
        Ok(())
    }

    async fn remove_collaborator(&self, _org: &str, repo: &str, login: &str) -> GitHubResult<()> {
        self.record(format!("remove_collaborator {repo} {login}")).await;
        if let Some(collaborators) = self.state.lock().await.repo_collaborators.get_mut(repo) {
            collaborators.retain(|c| c.login != login);
        }
        Ok(())
    }

    async fn list_repo_invitations(
        &self,
        _org: &str,
        repo: &str,
    ) -> GitHubResult<Vec<RepoInvitation>> {
        Ok(self
            .state
            .lock()
            .await
            .repo_invitations
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_repo_invitation(
        &self,
        _org: &str,
        repo: &str,
        invitation_id: i64,
        permission: &str,
    ) -> GitHubResult<()> {
        self.record(format!("update_repo_invitation {repo} {invitation_id} {permission}"))
            .await;
        Ok(())
    }

    async fn delete_repo_invitation(
        &self,
        _org: &str,
        repo: &str,
        invitation_id: i64,
    ) -> GitHubResult<()> {
        self.record(format!("delete_repo_invitation {repo} {invitation_id}")).await;
        Ok(())
    }

    async fn get_fork_pr_approval_policy(&self, _org: &str, repo: &str) -> GitHubResult<String> {
        Ok(self
            .state
            .lock()
            .await
            .approval_policies
            .get(repo)
            .cloned()
            .unwrap_or_else(|| "first_time_contributors".to_string()))
    }

    async fn set_fork_pr_approval_policy(
        &self,
        _org: &str,
        repo: &str,
        policy: &str,
    ) -> GitHubResult<()> {
        self.record(format!("set_fork_pr_approval_policy {repo} {policy}")).await;
        self.state
            .lock()
            .await
            .approval_policies
            .insert(repo.to_string(), policy.to_string());
        Ok(())
    }

    async fn list_repo_rulesets(&self, _org: &str, repo: &str) -> GitHubResult<Vec<RepoRuleset>> {
        Ok(self
            .state
            .lock()
            .await
            .repo_rulesets
            .get(repo)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_repo_ruleset(
        &self,
        _org: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> GitHubResult<RepoRuleset> {
        self.state
            .lock()
            .await
            .repo_rulesets
            .get(repo)
            .and_then(|rulesets| rulesets.iter().find(|r| r.id == Some(ruleset_id)))
            .cloned()
            .ok_or_else(|| GitHubError::not_found("ruleset", ruleset_id.to_string()))
    }

    async fn create_repo_ruleset(
        &self,
        _org: &str,
        repo: &str,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        self.record(format!("create_repo_ruleset {repo} {}", ruleset.name)).await;
        Ok(())
    }

    async fn update_repo_ruleset(
        &self,
        _org: &str,
        repo: &str,
        ruleset_id: i64,
        ruleset: &RepoRuleset,
    ) -> GitHubResult<()> {
        self.record(format!("update_repo_ruleset {repo} {ruleset_id} {}", ruleset.name))
            .await;
        Ok(())
    }

    async fn delete_repo_ruleset(
        &self,
        _org: &str,
        repo: &str,
        ruleset_id: i64,
    ) -> GitHubResult<()> {
        self.record(format!("delete_repo_ruleset {repo} {ruleset_id}")).await;
        Ok(())
    }

    async fn get_file_content(
        &self,
        _org: &str,
        _repo: &str,
        path: &str,
        _git_ref: &str,
    ) -> GitHubResult<ContentFile> {
        Err(GitHubError::not_found("file", path))
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
        Err(GitHubError::not_found("pull request", number.to_string()))
    }

    async fn create_check_run(
        &self,
        _org: &str,
        repo: &str,
        check: &CheckRunInput,
    ) -> GitHubResult<()> {
        self.record(format!("create_check_run {repo} {} {}", check.status, check.name))
            .await;
        Ok(())
    }

    async fn create_gist(&self, file_name: &str, _content: &str) -> GitHubResult<CreatedGist> {
        self.record(format!("create_gist {file_name}")).await;
        Ok(CreatedGist {
            id: "gist-1".to_string(),
            raw_url: "https://gist.example/raw/gist-1".to_string(),
        })
    }
}
