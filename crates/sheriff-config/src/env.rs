//! Process environment for sheriff.
//!
//! All knobs are plain environment variables (§ deployment docs). Loading
//! goes through a reader indirection so tests can supply variables without
//! mutating process-global state.

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// One trusted-releaser policy entry, JSON-encoded in
/// `SHERIFF_TRUSTED_RELEASER_POLICIES`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaserPolicy {
    pub repository: String,
    pub releaser: String,
    #[serde(rename = "mustMatchRepo")]
    pub must_match_repo: String,
    pub actions: Vec<String>,
}

/// Everything sheriff reads from the environment.
#[derive(Debug, Clone)]
pub struct SheriffEnv {
    /// Org hosting the permissions file; also the org whose PRs trigger
    /// dry runs.
    pub permissions_file_org: String,
    pub permissions_file_repo: String,
    pub permissions_file_path: String,
    pub permissions_file_ref: String,
    /// When set, the document is read from this local path instead of the
    /// platform.
    pub permissions_file_local_path: Option<String>,

    pub webhook_secret: String,
    pub github_app_creds: Option<String>,
    pub gist_token: Option<String>,

    /// Login the controller acts as; self-events are suppressed for some
    /// event types.
    pub self_login: Option<String>,
    /// Branch whose deletion is always critical, alongside the release-line
    /// patterns.
    pub important_branch: Option<String>,
    pub trusted_releasers: Vec<String>,
    pub trusted_releaser_policies: Vec<ReleaserPolicy>,

    pub plugins: Vec<String>,
    pub port: u16,
    pub host_url: Option<String>,

    pub slack_webhook_url: Option<String>,
    pub slack_token: Option<String>,
    pub gsuite_credentials: Option<String>,
    pub gsuite_token: Option<String>,
    pub gsuite_domain: Option<String>,
    pub slack_domain: Option<String>,
    pub heroku_token: Option<String>,
    pub heroku_magic_admin: Option<String>,
    pub npm_trusted_publisher_client_id: Option<String>,
    pub auto_tunnel_ngrok: Option<String>,
}

impl SheriffEnv {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load from a custom variable reader (tests).
    pub fn from_reader<F>(reader: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let permissions_file_org = reader("PERMISSIONS_FILE_ORG")
            .map_err(|_| EnvError::MissingVar("PERMISSIONS_FILE_ORG".into()))?;

        let port = reader("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| EnvError::InvalidValue("PORT".into(), e.to_string()))?;

        let trusted_releaser_policies = match reader("SHERIFF_TRUSTED_RELEASER_POLICIES") {
            Ok(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw).map_err(|e| {
                EnvError::InvalidValue("SHERIFF_TRUSTED_RELEASER_POLICIES".into(), e.to_string())
            })?,
            _ => Vec::new(),
        };

        Ok(Self {
            permissions_file_org,
            permissions_file_repo: reader("PERMISSIONS_FILE_REPO")
                .unwrap_or_else(|_| ".permissions".to_string()),
            permissions_file_path: reader("PERMISSIONS_FILE_PATH")
                .unwrap_or_else(|_| "config.yaml".to_string()),
            permissions_file_ref: reader("PERMISSIONS_FILE_REF")
                .unwrap_or_else(|_| "main".to_string()),
            permissions_file_local_path: reader("PERMISSIONS_FILE_LOCAL_PATH").ok(),
            webhook_secret: reader("GITHUB_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "development".to_string()),
            github_app_creds: reader("SHERIFF_GITHUB_APP_CREDS").ok(),
            gist_token: reader("SHERIFF_GIST_TOKEN").ok(),
            self_login: reader("SHERIFF_SELF_LOGIN").ok(),
            important_branch: reader("SHERIFF_IMPORTANT_BRANCH").ok(),
            trusted_releasers: csv(reader("SHERIFF_TRUSTED_RELEASERS").ok()),
            trusted_releaser_policies,
            plugins: csv(reader("SHERIFF_PLUGINS").ok()),
            port,
            host_url: reader("SHERIFF_HOST_URL").ok(),
            slack_webhook_url: reader("SLACK_WEBHOOK_URL").ok(),
            slack_token: reader("SLACK_TOKEN").ok(),
            gsuite_credentials: reader("GSUITE_CREDENTIALS").ok(),
            gsuite_token: reader("GSUITE_TOKEN").ok(),
            gsuite_domain: reader("SHERIFF_GSUITE_DOMAIN").ok(),
            slack_domain: reader("SHERIFF_SLACK_DOMAIN").ok(),
            heroku_token: reader("HEROKU_TOKEN").ok(),
            heroku_magic_admin: reader("HEROKU_MAGIC_ADMIN").ok(),
            npm_trusted_publisher_client_id: reader("NPM_TRUSTED_PUBLISHER_GITHUB_APP_CLIENT_ID")
                .ok(),
            auto_tunnel_ngrok: reader("AUTO_TUNNEL_NGROK").ok(),
        })
    }

    /// Whether `(org, repo)` is the repository holding the permissions file.
    #[must_use]
    pub fn is_config_repo(&self, org: &str, repo: &str) -> bool {
        org == self.permissions_file_org && repo == self.permissions_file_repo
    }
}

fn csv(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env::VarError;

    fn make_reader(vars: HashMap<&str, &str>) -> impl Fn(&str) -> Result<String, VarError> {
        let owned: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| owned.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn org_is_required() {
        let result = SheriffEnv::from_reader(make_reader(HashMap::new()));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("PERMISSIONS_FILE_ORG"));
    }

    #[test]
    fn defaults() {
        let env =
            SheriffEnv::from_reader(make_reader(HashMap::from([("PERMISSIONS_FILE_ORG", "electron")])))
                .unwrap();
        assert_eq!(env.permissions_file_repo, ".permissions");
        assert_eq!(env.permissions_file_path, "config.yaml");
        assert_eq!(env.permissions_file_ref, "main");
        assert_eq!(env.webhook_secret, "development");
        assert_eq!(env.port, 8080);
        assert!(env.trusted_releasers.is_empty());
        assert!(env.trusted_releaser_policies.is_empty());
        assert!(env.is_config_repo("electron", ".permissions"));
        assert!(!env.is_config_repo("electron", "app"));
    }

    #[test]
    fn csv_lists_are_trimmed() {
        let env = SheriffEnv::from_reader(make_reader(HashMap::from([
            ("PERMISSIONS_FILE_ORG", "electron"),
            ("SHERIFF_TRUSTED_RELEASERS", "bot, release-runner ,"),
            ("SHERIFF_PLUGINS", "slack,gsuite"),
        ])))
        .unwrap();
        assert_eq!(env.trusted_releasers, vec!["bot", "release-runner"]);
        assert_eq!(env.plugins, vec!["slack", "gsuite"]);
    }

    #[test]
    fn releaser_policies_parse_from_json() {
        let env = SheriffEnv::from_reader(make_reader(HashMap::from([
            ("PERMISSIONS_FILE_ORG", "electron"),
            (
                "SHERIFF_TRUSTED_RELEASER_POLICIES",
                r#"[{"repository":"app","releaser":"bot","mustMatchRepo":"upstream","actions":["published"]}]"#,
            ),
        ])))
        .unwrap();
        assert_eq!(env.trusted_releaser_policies.len(), 1);
        let policy = &env.trusted_releaser_policies[0];
        assert_eq!(policy.must_match_repo, "upstream");
        assert_eq!(policy.actions, vec!["published"]);
    }

    #[test]
    fn malformed_policy_json_is_rejected() {
        let result = SheriffEnv::from_reader(make_reader(HashMap::from([
            ("PERMISSIONS_FILE_ORG", "electron"),
            ("SHERIFF_TRUSTED_RELEASER_POLICIES", "{not json"),
        ])));
        assert!(matches!(result, Err(EnvError::InvalidValue(..))));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = SheriffEnv::from_reader(make_reader(HashMap::from([
            ("PERMISSIONS_FILE_ORG", "electron"),
            ("PORT", "not-a-port"),
        ])));
        assert!(matches!(result, Err(EnvError::InvalidValue(..))));
    }
}
