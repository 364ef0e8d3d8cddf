//! Webhook enforcement scenarios over the platform stub.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{StubGitHub, StubProvider, StubState};
use serde_json::json;
use sheriff_alerts::{DynAlertSink, MemorySink, Severity};
use sheriff_config::SheriffEnv;
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::types::{Collaborator, GitHubUser, PermissionFlags, Release};
use sheriff_github::AccessLevel;
use sheriff_webhooks::EnforcementEngine;

const CONFIG_YAML: &str = r"
organization: electron
repository_defaults: {has_wiki: false}
repositories:
  - name: app
    external_collaborators: {bob: read}
";

fn test_env(extra: &[(&str, &str)]) -> SheriffEnv {
    let mut vars: HashMap<String, String> =
        HashMap::from([("PERMISSIONS_FILE_ORG".to_string(), "electron".to_string())]);
    for (key, value) in extra {
        vars.insert((*key).to_string(), (*value).to_string());
    }
    SheriffEnv::from_reader(|key| {
        vars.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    })
    .expect("test env must load")
}

struct Setup {
    engine: EnforcementEngine,
    stub: Arc<StubGitHub>,
    sink: Arc<MemorySink>,
}

fn setup(env: SheriffEnv, state: StubState) -> Setup {
    let stub = StubGitHub::new(state);
    let provider: Arc<dyn CredentialProvider> = Arc::new(StubProvider {
        client: Arc::clone(&stub),
    });
    let sink = Arc::new(MemorySink::new());
    let engine = EnforcementEngine::new(env, provider, Arc::clone(&sink) as DynAlertSink, None);
    Setup { engine, stub, sink }
}

fn collaborator(id: i64, login: &str, level: AccessLevel) -> Collaborator {
    Collaborator {
        id,
        login: login.to_string(),
        permissions: PermissionFlags::from_level(level),
    }
}

fn member_event(action: &str, login: &str, repo: &str) -> serde_json::Value {
    json!({
        "action": action,
        "member": {"id": 2, "login": login},
        "repository": {"name": repo, "owner": {"id": 9, "login": "electron"}},
        "sender": {"id": 3, "login": "mallory"},
    })
}

#[tokio::test]
async fn escalated_collaborator_is_adjusted_back() {
    let mut state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    state
        .collaborators
        .insert("app".to_string(), vec![collaborator(2, "bob", AccessLevel::Admin)]);

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-1", member_event("edited", "bob", "app"))
        .await
        .unwrap();

    assert_eq!(
        s.stub.mutation_log().await,
        vec!["add_collaborator app bob pull"]
    );
    let messages = s.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Critical);
    assert!(messages[0]
        .text()
        .contains("adjusted to the correct state of `read`"));
    assert_eq!(messages[0].metadata.as_ref().unwrap()["action"], "edited");
}

#[tokio::test]
async fn removed_declared_collaborator_is_reverted() {
    let state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-2", member_event("removed", "bob", "app"))
        .await
        .unwrap();

    assert_eq!(
        s.stub.mutation_log().await,
        vec!["add_collaborator app bob pull"]
    );
    assert!(s.sink.messages().await[0]
        .text()
        .contains("automatically reverted"));
}

#[tokio::test]
async fn undeclared_collaborator_is_removed() {
    let mut state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    state
        .collaborators
        .insert("app".to_string(), vec![collaborator(4, "mallory", AccessLevel::Write)]);

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-3", member_event("added", "mallory", "app"))
        .await
        .unwrap();

    assert_eq!(
        s.stub.mutation_log().await,
        vec!["remove_collaborator app mallory"]
    );
    assert!(s.sink.messages().await[0]
        .text()
        .contains("automatically reverted"));
}

#[tokio::test]
async fn matching_collaborator_state_is_allowed_silently() {
    let mut state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    state
        .collaborators
        .insert("app".to_string(), vec![collaborator(2, "bob", AccessLevel::Read)]);

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-4", member_event("edited", "bob", "app"))
        .await
        .unwrap();

    assert!(s.stub.mutation_log().await.is_empty());
    assert!(s.sink.messages().await.is_empty());
}

#[tokio::test]
async fn org_owner_changes_are_allowed() {
    let mut state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    state.owners.push(GitHubUser {
        id: 2,
        login: "bob".to_string(),
        avatar_url: None,
    });

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-5", member_event("edited", "bob", "app"))
        .await
        .unwrap();

    assert!(s.stub.mutation_log().await.is_empty());
    assert!(s.sink.messages().await.is_empty());
}

#[tokio::test]
async fn events_for_undeclared_repos_are_allowed() {
    let state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };

    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("member", "d-6", member_event("added", "bob", "unmanaged"))
        .await
        .unwrap();

    assert!(s.stub.mutation_log().await.is_empty());
    assert!(s.sink.messages().await.is_empty());
}

fn release_event(action: &str, sender: &str, repo: &str, tag: &str) -> serde_json::Value {
    json!({
        "action": action,
        "release": {"tag_name": tag},
        "repository": {"name": repo, "owner": {"id": 9, "login": "electron"}},
        "sender": {"id": 7, "login": sender},
    })
}

const POLICY_JSON: &str =
    r#"[{"repository":"app","releaser":"bot","mustMatchRepo":"upstream","actions":["published"]}]"#;

#[tokio::test]
async fn rogue_automated_release_is_critical() {
    let state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    // No release v1.2.3 exists on `upstream`.
    let s = setup(
        test_env(&[("SHERIFF_TRUSTED_RELEASER_POLICIES", POLICY_JSON)]),
        state,
    );
    s.engine
        .handle_event("release", "d-7", release_event("published", "bot", "app", "v1.2.3"))
        .await
        .unwrap();

    let messages = s.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Critical);
    assert!(messages[0].text().contains("v1.2.3"));
}

#[tokio::test]
async fn policy_matched_release_with_upstream_tag_is_silent() {
    let mut state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    state.releases.insert(
        "upstream".to_string(),
        vec![Release {
            id: 1,
            tag_name: "v1.2.3".to_string(),
            draft: false,
        }],
    );

    let s = setup(
        test_env(&[("SHERIFF_TRUSTED_RELEASER_POLICIES", POLICY_JSON)]),
        state,
    );
    s.engine
        .handle_event("release", "d-8", release_event("published", "bot", "app", "v1.2.3"))
        .await
        .unwrap();

    assert!(s.sink.messages().await.is_empty());
}

#[tokio::test]
async fn trusted_releaser_is_always_silent() {
    let state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    let s = setup(test_env(&[("SHERIFF_TRUSTED_RELEASERS", "bot")]), state);
    s.engine
        .handle_event("release", "d-9", release_event("deleted", "bot", "app", "v1.2.3"))
        .await
        .unwrap();
    assert!(s.sink.messages().await.is_empty());
}

#[tokio::test]
async fn untrusted_release_deletion_is_critical() {
    let state = StubState {
        config_yaml: CONFIG_YAML.to_string(),
        ..StubState::default()
    };
    let s = setup(test_env(&[]), state);
    s.engine
        .handle_event("release", "d-10", release_event("deleted", "mallory", "app", "v1.2.3"))
        .await
        .unwrap();
    assert_eq!(s.sink.messages().await[0].severity, Severity::Critical);
}

#[tokio::test]
async fn tag_deletion_by_untrusted_sender_warns() {
    let s = setup(test_env(&[]), StubState::default());
    s.engine
        .handle_event(
            "delete",
            "d-11",
            json!({
                "ref": "v1.0.0",
                "ref_type": "tag",
                "repository": {"name": "app", "owner": {"id": 9, "login": "electron"}},
                "sender": {"id": 3, "login": "mallory"},
            }),
        )
        .await
        .unwrap();

    let messages = s.sink.messages().await;
    assert_eq!(messages[0].severity, Severity::Warning);
    assert!(messages[0].text().contains("Tag `v1.0.0`"));
}

#[tokio::test]
async fn release_line_branch_deletion_is_critical() {
    let s = setup(test_env(&[]), StubState::default());
    s.engine
        .handle_event(
            "delete",
            "d-12",
            json!({
                "ref": "12-x-y",
                "ref_type": "branch",
                "repository": {"name": "app", "owner": {"id": 9, "login": "electron"}},
                "sender": {"id": 3, "login": "mallory"},
            }),
        )
        .await
        .unwrap();
    assert_eq!(s.sink.messages().await[0].severity, Severity::Critical);
}

#[tokio::test]
async fn ordinary_branch_deletion_is_ignored() {
    let s = setup(test_env(&[]), StubState::default());
    s.engine
        .handle_event(
            "delete",
            "d-13",
            json!({
                "ref": "feature/thing",
                "ref_type": "branch",
                "repository": {"name": "app", "owner": {"id": 9, "login": "electron"}},
                "sender": {"id": 3, "login": "mallory"},
            }),
        )
        .await
        .unwrap();
    assert!(s.sink.messages().await.is_empty());
}

#[tokio::test]
async fn self_repository_deletion_is_suppressed() {
    let env = test_env(&[("SHERIFF_SELF_LOGIN", "sheriff-bot")]);
    let s = setup(env, StubState::default());

    let event = |sender: &str| {
        json!({
            "action": "deleted",
            "repository": {"name": "app", "owner": {"id": 9, "login": "electron"}},
            "sender": {"id": 3, "login": sender},
        })
    };

    s.engine
        .handle_event("repository", "d-14", event("sheriff-bot"))
        .await
        .unwrap();
    assert!(s.sink.messages().await.is_empty());

    s.engine
        .handle_event("repository", "d-15", event("mallory"))
        .await
        .unwrap();
    let messages = s.sink.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].severity, Severity::Critical);
}

#[tokio::test]
async fn write_deploy_keys_are_critical() {
    let s = setup(test_env(&[]), StubState::default());
    s.engine
        .handle_event(
            "deploy_key",
            "d-16",
            json!({
                "action": "created",
                "key": {"title": "ci-key", "read_only": false},
                "repository": {"name": "app", "owner": {"id": 9, "login": "electron"}},
                "sender": {"id": 3, "login": "mallory"},
            }),
        )
        .await
        .unwrap();
    assert_eq!(s.sink.messages().await[0].severity, Severity::Critical);
}

#[tokio::test]
async fn unknown_events_are_accepted() {
    let s = setup(test_env(&[]), StubState::default());
    s.engine
        .handle_event("watch", "d-17", json!({"action": "started"}))
        .await
        .unwrap();
    assert!(s.sink.messages().await.is_empty());
}
