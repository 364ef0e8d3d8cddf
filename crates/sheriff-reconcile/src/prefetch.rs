//! Concurrent repository metadata prefetch.
//!
//! Before per-repo reconcile starts, every non-archived repo's teams,
//! pending invitations, direct collaborators and (when declared) rulesets
//! are fetched through a pool bounded at eight concurrent tasks. The pool
//! drains fully before any result is read, so reads after the barrier are
//! lock-free.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use sheriff_github::client::DynGitHubClient;
use sheriff_github::error::{GitHubError, GitHubResult};
use sheriff_github::types::{Collaborator, GitHubTeam, RepoInvitation, RepoRuleset};

/// Concurrent prefetch tasks in flight at once.
const PREFETCH_CONCURRENCY: usize = 8;

/// Everything per-repo reconcile needs to compare against.
#[derive(Debug, Default, Clone)]
pub struct RepoMetadata {
    pub teams: Vec<GitHubTeam>,
    pub invitations: Vec<RepoInvitation>,
    pub collaborators: Vec<Collaborator>,
    /// Full rulesets; only fetched when the repo declares any.
    pub rulesets: Vec<RepoRuleset>,
}

/// A prefetch work item.
#[derive(Debug, Clone)]
pub struct PrefetchTask {
    pub repo: String,
    pub fetch_rulesets: bool,
}

/// Fetch metadata for every task, eight repos at a time. Any failed fetch
/// fails the whole prefetch — a partial metadata map would make the
/// downstream reconcile silently skip work.
pub async fn prefetch_repo_metadata(
    client: DynGitHubClient,
    org: &str,
    tasks: Vec<PrefetchTask>,
) -> GitHubResult<HashMap<String, RepoMetadata>> {
    let semaphore = Arc::new(Semaphore::new(PREFETCH_CONCURRENCY));
    let mut join_set = JoinSet::new();

    for task in tasks {
        let client = Arc::clone(&client);
        let org = org.to_string();
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("prefetch semaphore never closes");
            let metadata = fetch_one(&client, &org, &task).await?;
            Ok::<(String, RepoMetadata), GitHubError>((task.repo, metadata))
        });
    }

    let mut results = HashMap::new();
    while let Some(joined) = join_set.join_next().await {
        let (repo, metadata) = joined.map_err(|e| GitHubError::Api {
            status: 0,
            message: format!("prefetch task panicked: {e}"),
        })??;
        results.insert(repo, metadata);
    }
    Ok(results)
}

async fn fetch_one(
    client: &DynGitHubClient,
    org: &str,
    task: &PrefetchTask,
) -> GitHubResult<RepoMetadata> {
    let repo = task.repo.as_str();
    tracing::debug!(org, repo, "prefetching repo metadata");

    let teams = client.list_repo_teams(org, repo).await?;
    let invitations = client.list_repo_invitations(org, repo).await?;
    let collaborators = client.list_direct_collaborators(org, repo).await?;

    let mut rulesets = Vec::new();
    if task.fetch_rulesets {
        for summary in client.list_repo_rulesets(org, repo).await? {
            if let Some(id) = summary.id {
                rulesets.push(client.get_repo_ruleset(org, repo, id).await?);
            }
        }
    }

    Ok(RepoMetadata {
        teams,
        invitations,
        collaborators,
        rulesets,
    })
}
