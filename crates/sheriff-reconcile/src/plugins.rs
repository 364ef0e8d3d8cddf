//! Plugin fan-out.
//!
//! Plugins perform platform-specific side effects (chat user-groups,
//! directory groups, hosting-service collaborators) after the core has
//! reconciled a team or repository. They are opaque collaborators: the
//! engine only knows the two optional callbacks. Both default to no-ops so
//! a plugin implements just the capabilities it has.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sheriff_alerts::AlertSink;
use sheriff_config::{OrganizationConfig, RepositoryConfig, TeamConfig};

use crate::error::{ReconcileError, ReconcileResult};

/// A reconciler plugin. Implement whichever callbacks apply.
#[async_trait]
pub trait SheriffPlugin: Send + Sync {
    /// Registry name, matching an entry in `SHERIFF_PLUGINS`.
    fn name(&self) -> &str;

    /// Called after each declared team is reconciled.
    async fn handle_team(
        &self,
        _org: &OrganizationConfig,
        _team: &TeamConfig,
        _sink: &dyn AlertSink,
    ) -> ReconcileResult<()> {
        Ok(())
    }

    /// Called after each declared repository is reconciled, archived
    /// repositories included. `teams` holds the teams granted on the repo.
    async fn handle_repo(
        &self,
        _org: &OrganizationConfig,
        _repo: &RepositoryConfig,
        _teams: &[&TeamConfig],
        _sink: &dyn AlertSink,
    ) -> ReconcileResult<()> {
        Ok(())
    }
}

/// Factory producing a plugin instance.
pub type PluginFactory = Box<dyn Fn() -> Arc<dyn SheriffPlugin> + Send + Sync>;

/// Registry of available plugin factories and the active set built from
/// `SHERIFF_PLUGINS`.
#[derive(Default)]
pub struct PluginRegistry {
    factories: HashMap<String, PluginFactory>,
    active: Vec<Arc<dyn SheriffPlugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under a plugin name.
    pub fn register(&mut self, name: impl Into<String>, factory: PluginFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Activate the named plugins. Naming a plugin with no registered
    /// factory is a startup error, not a silent skip.
    pub fn activate(&mut self, names: &[String]) -> ReconcileResult<()> {
        for name in names {
            let factory = self.factories.get(name.as_str()).ok_or_else(|| {
                ReconcileError::policy("startup", format!("unknown plugin: {name}"))
            })?;
            self.active.push(factory());
        }
        Ok(())
    }

    /// Active plugins in activation order.
    #[must_use]
    pub fn active(&self) -> &[Arc<dyn SheriffPlugin>] {
        &self.active
    }

    /// Fan a reconciled team out to every active plugin. Plugin failures
    /// are logged and do not stop the run.
    pub async fn dispatch_team(
        &self,
        org: &OrganizationConfig,
        team: &TeamConfig,
        sink: &dyn AlertSink,
    ) {
        for plugin in &self.active {
            if let Err(err) = plugin.handle_team(org, team, sink).await {
                tracing::warn!(
                    plugin = plugin.name(),
                    org = %org.organization,
                    team = %team.name,
                    error = %err,
                    "plugin handle_team failed"
                );
            }
        }
    }

    /// Fan a reconciled repository out to every active plugin.
    pub async fn dispatch_repo(
        &self,
        org: &OrganizationConfig,
        repo: &RepositoryConfig,
        sink: &dyn AlertSink,
    ) {
        let teams: Vec<&TeamConfig> = org
            .teams()
            .filter(|t| repo.teams.contains_key(&t.name))
            .collect();
        for plugin in &self.active {
            if let Err(err) = plugin.handle_repo(org, repo, &teams, sink).await {
                tracing::warn!(
                    plugin = plugin.name(),
                    org = %org.organization,
                    repo = %repo.name,
                    error = %err,
                    "plugin handle_repo failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPlugin {
        teams_seen: Arc<AtomicUsize>,
        repos_seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SheriffPlugin for CountingPlugin {
        fn name(&self) -> &str {
            "counting"
        }

        async fn handle_team(
            &self,
            _org: &OrganizationConfig,
            _team: &TeamConfig,
            _sink: &dyn AlertSink,
        ) -> ReconcileResult<()> {
            self.teams_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn handle_repo(
            &self,
            _org: &OrganizationConfig,
            _repo: &RepositoryConfig,
            teams: &[&TeamConfig],
            _sink: &dyn AlertSink,
        ) -> ReconcileResult<()> {
            assert_eq!(teams.len(), 1);
            self.repos_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn org_fixture() -> OrganizationConfig {
        sheriff_config::load_from_str(
            r"
organization: electron
repository_defaults: {has_wiki: false}
teams:
  - name: core
    maintainers: [alice]
repositories:
  - name: app
    teams: {core: write}
",
        )
        .unwrap()
        .remove(0)
    }

    #[tokio::test]
    async fn activation_rejects_unknown_names() {
        let mut registry = PluginRegistry::new();
        let err = registry.activate(&["gsuite".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown plugin: gsuite"));
    }

    #[tokio::test]
    async fn active_plugins_receive_both_callbacks() {
        let teams_seen = Arc::new(AtomicUsize::new(0));
        let repos_seen = Arc::new(AtomicUsize::new(0));
        let (teams_clone, repos_clone) = (Arc::clone(&teams_seen), Arc::clone(&repos_seen));

        let mut registry = PluginRegistry::new();
        registry.register(
            "counting",
            Box::new(move || {
                Arc::new(CountingPlugin {
                    teams_seen: Arc::clone(&teams_clone),
                    repos_seen: Arc::clone(&repos_clone),
                })
            }),
        );
        registry.activate(&["counting".to_string()]).unwrap();

        let org = org_fixture();
        let sink = sheriff_alerts::MemorySink::new();
        let team = org.teams().next().unwrap().clone();
        registry.dispatch_team(&org, &team, &sink).await;
        registry.dispatch_repo(&org, &org.repositories[0], &sink).await;

        assert_eq!(teams_seen.load(Ordering::SeqCst), 1);
        assert_eq!(repos_seen.load(Ordering::SeqCst), 1);
    }
}
