//! The per-org reconcile pipeline.

use std::collections::{HashMap, HashSet};

use sheriff_config::{OrganizationConfig, RepositoryConfig, Visibility};
use sheriff_github::client::DynGitHubClient;
use sheriff_github::filters::is_visible_repo;
use sheriff_github::types::{GitHubRepository, NewRepository};

use crate::context::{OrgReporter, ReconcileContext};
use crate::error::{ReconcileError, ReconcileResult};
use crate::prefetch::{prefetch_repo_metadata, PrefetchTask, RepoMetadata};
use crate::repos::{reconcile_repo, RepoReconcileInput};
use crate::{invites, properties, teams};

/// Drives the declared state of each org onto the platform.
pub struct Reconciler {
    ctx: ReconcileContext,
}

impl Reconciler {
    #[must_use]
    pub fn new(ctx: ReconcileContext) -> Self {
        Self { ctx }
    }

    #[must_use]
    pub fn context(&self) -> &ReconcileContext {
        &self.ctx
    }

    /// Reconcile every org in document order. A failed org aborts its own
    /// loop but never the orgs after it.
    pub async fn run(&self, orgs: &[OrganizationConfig]) -> ReconcileResult<()> {
        let mut failed = 0usize;
        for org in orgs {
            if let Err(err) = self.reconcile_org(org).await {
                tracing::error!(org = %org.organization, error = %err, "org reconcile aborted");
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(ReconcileError::policy(
                "run",
                format!("{failed} of {} org(s) aborted", orgs.len()),
            ));
        }
        Ok(())
    }

    /// Reconcile one org. Narration is flushed even when the run halts
    /// part-way through on a policy violation.
    pub async fn reconcile_org(&self, org: &OrganizationConfig) -> ReconcileResult<()> {
        tracing::info!(org = %org.organization, dry_run = self.ctx.dry_run, "reconciling org");
        let mut reporter = OrgReporter::new(&org.organization);
        let result = self.reconcile_org_inner(org, &mut reporter).await;
        reporter.flush(&self.ctx.sink).await?;
        result
    }

    async fn reconcile_org_inner(
        &self,
        org: &OrganizationConfig,
        reporter: &mut OrgReporter,
    ) -> ReconcileResult<()> {
        let ctx = &self.ctx;
        let org_name = org.organization.as_str();
        let client = ctx.cache.client(org_name, false).await?;

        // 1. Custom property definitions.
        properties::sync_custom_properties(ctx, reporter, &client, org).await?;

        // 2. Org invitations for declared users not yet in the org.
        let pending_invites = invites::sync_user_invitations(ctx, reporter, &client, org).await?;

        // 3. Warn about observed repos the document does not name; they
        //    default to no granted permissions.
        let mut working_repos: Vec<RepositoryConfig> = org.repositories.clone();
        let observed_repos = ctx.cache.repos(org_name).await?;
        for observed in observed_repos.iter() {
            if !is_visible_repo(&observed.name) {
                continue;
            }
            if org.repository(&observed.name).is_none() {
                reporter.warn(format!(
                    "Repository {} is not in the permissions file; it defaults to no granted permissions",
                    observed.name
                ));
                working_repos.push(RepositoryConfig::untracked(&observed.name));
            }
        }

        // 4. Orphan teams.
        self.delete_orphan_teams(org, reporter, &client).await?;

        // 5. Team state machine, with plugin fan-out per team.
        let owners: HashSet<String> = ctx
            .cache
            .org_owners(org_name)
            .await?
            .iter()
            .map(|u| u.login.clone())
            .collect();
        for team in org.teams() {
            teams::reconcile_team(ctx, reporter, &client, org, team, &pending_invites, &owners)
                .await?;
            ctx.plugins.dispatch_team(org, team, ctx.sink.as_ref()).await;
        }

        // 6. Create declared repos that do not exist. A dry run cannot
        //    observe the repo it did not create, so it proceeds against a
        //    placeholder.
        let mut placeholders: HashMap<String, GitHubRepository> = HashMap::new();
        let mut observed_names: HashSet<String> =
            observed_repos.iter().map(|r| r.name.clone()).collect();
        for repo in &org.repositories {
            if observed_names.contains(&repo.name) {
                continue;
            }
            reporter.note(format!("Creating Repo `{}`", repo.name));
            if ctx.dry_run {
                placeholders.insert(repo.name.clone(), placeholder_repo(repo));
                continue;
            }
            let new_repo = NewRepository {
                name: repo.name.clone(),
                has_wiki: false,
                private: match repo.visibility {
                    Visibility::Private => Some(true),
                    Visibility::Public => Some(false),
                    Visibility::Current => None,
                },
            };
            match client.create_repo(org_name, &new_repo).await {
                Ok(created) => {
                    observed_names.insert(created.name.clone());
                    placeholders.insert(repo.name.clone(), created);
                    ctx.cache.invalidate_repos(org_name).await;
                }
                Err(err) => {
                    tracing::warn!(org = org_name, repo = %repo.name, error = %err, "repo creation failed");
                }
            }
        }

        let observed_by_name: HashMap<&str, &GitHubRepository> = observed_repos
            .iter()
            .map(|r| (r.name.as_str(), r))
            .chain(placeholders.iter().map(|(k, v)| (k.as_str(), v)))
            .collect();

        // 7. Bounded-concurrency metadata prefetch; the pool drains before
        //    any per-repo reconcile starts.
        let tasks: Vec<PrefetchTask> = working_repos
            .iter()
            .filter(|repo| {
                observed_by_name
                    .get(repo.name.as_str())
                    .is_some_and(|o| !o.archived)
                    && !placeholders.contains_key(&repo.name)
            })
            .map(|repo| PrefetchTask {
                repo: repo.name.clone(),
                fetch_rulesets: repo.declares_rulesets(),
            })
            .collect();
        let mut metadata =
            prefetch_repo_metadata(client.clone(), org_name, tasks).await?;
        for name in placeholders.keys() {
            metadata.insert(name.clone(), RepoMetadata::default());
        }

        // 8. Per-repo reconcile in declaration order; archived repos skip
        //    straight to the plugin fan-out.
        for repo in &working_repos {
            let Some(&observed) = observed_by_name.get(repo.name.as_str()) else {
                // Creation failed earlier in a live run.
                continue;
            };
            if !observed.archived {
                let Some(repo_metadata) = metadata.get(repo.name.as_str()) else {
                    continue;
                };
                let actions_before = reporter.actions();
                let input = RepoReconcileInput {
                    org,
                    repo,
                    observed,
                    metadata: repo_metadata,
                };
                reconcile_repo(ctx, reporter, &client, &input).await?;
                if reporter.actions() > actions_before {
                    reporter.divider();
                }
            }
            ctx.plugins.dispatch_repo(org, repo, ctx.sink.as_ref()).await;
        }

        Ok(())
    }

    async fn delete_orphan_teams(
        &self,
        org: &OrganizationConfig,
        reporter: &mut OrgReporter,
        client: &DynGitHubClient,
    ) -> ReconcileResult<()> {
        let ctx = &self.ctx;
        let org_name = org.organization.as_str();
        let declared: HashSet<&str> = org.teams().map(|t| t.name.as_str()).collect();

        let observed = ctx.cache.teams(org_name).await?;
        for team in observed.iter() {
            if declared.contains(team.name.as_str()) {
                continue;
            }
            reporter.note(format!(
                "Deleting Team `{}` as it is no longer in the permissions file",
                team.name
            ));
            if !ctx.dry_run {
                if let Err(err) = client.delete_team(org_name, &team.slug).await {
                    tracing::warn!(org = org_name, team = %team.slug, error = %err, "team delete failed");
                }
            }
        }
        Ok(())
    }
}

/// Observed stand-in for a repo a dry run declined to create: exactly what
/// creation would have produced.
fn placeholder_repo(repo: &RepositoryConfig) -> GitHubRepository {
    GitHubRepository {
        id: -1,
        name: repo.name.clone(),
        private: repo.visibility == Visibility::Private,
        archived: false,
        has_wiki: false,
        stargazers_count: Some(0),
        owner: None,
    }
}
