//! Per-org memoization of clients and fleet-wide listings.
//!
//! Listings are written once on first miss and read thereafter; the
//! reconciler explicitly invalidates the repo listing after creating a repo
//! and the team listing after creating a team. Entries live for one
//! reconcile run — the cache is an injected dependency, not a global.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::client::DynGitHubClient;
use crate::credentials::CredentialProvider;
use crate::error::GitHubResult;
use crate::types::{GitHubRepository, GitHubTeam, GitHubUser};

#[derive(Default)]
struct OrgListings {
    members: Option<Arc<Vec<GitHubUser>>>,
    owners: Option<Arc<Vec<GitHubUser>>>,
    teams: Option<Arc<Vec<GitHubTeam>>>,
    repos: Option<Arc<Vec<GitHubRepository>>>,
}

/// Memoizing facade over a [`CredentialProvider`].
pub struct ClientCache {
    provider: Arc<dyn CredentialProvider>,
    clients: RwLock<HashMap<(String, bool), DynGitHubClient>>,
    listings: RwLock<HashMap<String, OrgListings>>,
}

impl ClientCache {
    #[must_use]
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            clients: RwLock::new(HashMap::new()),
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// Whether the underlying provider forces read-only clients.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.provider.dry_run()
    }

    /// Memoized client for `org`.
    pub async fn client(&self, org: &str, read_only: bool) -> GitHubResult<DynGitHubClient> {
        let key = (org.to_string(), read_only);
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(&key) {
                return Ok(Arc::clone(client));
            }
        }

        let client = self.provider.client_for_org(org, read_only).await?;

        let mut clients = self.clients.write().await;
        // Another task may have raced us here; keep the first one.
        Ok(Arc::clone(
            clients.entry(key).or_insert_with(|| Arc::clone(&client)),
        ))
    }

    /// All org members, fetched once per run.
    pub async fn org_members(&self, org: &str) -> GitHubResult<Arc<Vec<GitHubUser>>> {
        {
            let listings = self.listings.read().await;
            if let Some(members) = listings.get(org).and_then(|l| l.members.clone()) {
                return Ok(members);
            }
        }
        let client = self.client(org, true).await?;
        let members = Arc::new(client.list_org_members(org).await?);
        let mut listings = self.listings.write().await;
        listings.entry(org.to_string()).or_default().members = Some(Arc::clone(&members));
        Ok(members)
    }

    /// All org owners, fetched once per run.
    pub async fn org_owners(&self, org: &str) -> GitHubResult<Arc<Vec<GitHubUser>>> {
        {
            let listings = self.listings.read().await;
            if let Some(owners) = listings.get(org).and_then(|l| l.owners.clone()) {
                return Ok(owners);
            }
        }
        let client = self.client(org, true).await?;
        let owners = Arc::new(client.list_org_owners(org).await?);
        let mut listings = self.listings.write().await;
        listings.entry(org.to_string()).or_default().owners = Some(Arc::clone(&owners));
        Ok(owners)
    }

    /// All teams in the org, fetched once per run or since the last
    /// [`invalidate_teams`](Self::invalidate_teams).
    pub async fn teams(&self, org: &str) -> GitHubResult<Arc<Vec<GitHubTeam>>> {
        {
            let listings = self.listings.read().await;
            if let Some(teams) = listings.get(org).and_then(|l| l.teams.clone()) {
                return Ok(teams);
            }
        }
        let client = self.client(org, true).await?;
        let teams = Arc::new(client.list_teams(org).await?);
        let mut listings = self.listings.write().await;
        listings.entry(org.to_string()).or_default().teams = Some(Arc::clone(&teams));
        Ok(teams)
    }

    /// All repositories in the org, fetched once per run or since the last
    /// [`invalidate_repos`](Self::invalidate_repos).
    pub async fn repos(&self, org: &str) -> GitHubResult<Arc<Vec<GitHubRepository>>> {
        {
            let listings = self.listings.read().await;
            if let Some(repos) = listings.get(org).and_then(|l| l.repos.clone()) {
                return Ok(repos);
            }
        }
        let client = self.client(org, true).await?;
        let repos = Arc::new(client.list_repos(org).await?);
        let mut listings = self.listings.write().await;
        listings.entry(org.to_string()).or_default().repos = Some(Arc::clone(&repos));
        Ok(repos)
    }

    /// Drop the memoized team listing after a team creation.
    pub async fn invalidate_teams(&self, org: &str) {
        let mut listings = self.listings.write().await;
        if let Some(entry) = listings.get_mut(org) {
            entry.teams = None;
        }
    }

    /// Drop the memoized repo listing after a repo creation.
    pub async fn invalidate_repos(&self, org: &str) {
        let mut listings = self.listings.write().await;
        if let Some(entry) = listings.get_mut(org) {
            entry.repos = None;
        }
    }
}
