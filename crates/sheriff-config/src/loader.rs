//! Permissions document loading.
//!
//! Sources are tried in order: `config.yml` and `config.yaml` in the
//! working directory, the path named by `PERMISSIONS_FILE_LOCAL_PATH`, and
//! finally the platform itself at the configured `(org, repo, path, ref)`.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sheriff_github::client::GitHubClient;

use crate::env::SheriffEnv;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{OrganizationConfig, PermissionsConfig};
use crate::{normalize, validate};

/// Parse, normalize and validate a document from raw YAML.
pub fn load_from_str(raw: &str) -> ConfigResult<Vec<OrganizationConfig>> {
    let config: PermissionsConfig = serde_yaml::from_str(raw)?;
    let mut orgs = config.into_orgs();
    normalize::expand(&mut orgs);
    validate::validate(&mut orgs)?;
    Ok(orgs)
}

/// Load the document from the first available source.
///
/// `client` is only consulted when no local source exists; passing `None`
/// in that situation yields [`ConfigError::Missing`].
pub async fn load(
    env: &SheriffEnv,
    client: Option<&dyn GitHubClient>,
) -> ConfigResult<Vec<OrganizationConfig>> {
    if let Some(raw) = read_local(env)? {
        return load_from_str(&raw);
    }

    let Some(client) = client else {
        return Err(ConfigError::Missing(
            "no local permissions file and no platform client available".to_string(),
        ));
    };

    let raw = fetch_remote(env, client).await?;
    load_from_str(&raw)
}

fn read_local(env: &SheriffEnv) -> ConfigResult<Option<String>> {
    let mut candidates = vec!["config.yml".to_string(), "config.yaml".to_string()];
    if let Some(path) = &env.permissions_file_local_path {
        candidates.push(path.clone());
    }

    for candidate in candidates {
        let path = Path::new(&candidate);
        if path.exists() {
            tracing::debug!(path = %candidate, "reading permissions file locally");
            let raw = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::Missing(format!("cannot read {candidate}: {e}")))?;
            return Ok(Some(raw));
        }
    }
    Ok(None)
}

async fn fetch_remote(env: &SheriffEnv, client: &dyn GitHubClient) -> ConfigResult<String> {
    tracing::debug!(
        org = %env.permissions_file_org,
        repo = %env.permissions_file_repo,
        path = %env.permissions_file_path,
        git_ref = %env.permissions_file_ref,
        "fetching permissions file from the platform"
    );

    let file = client
        .get_file_content(
            &env.permissions_file_org,
            &env.permissions_file_repo,
            &env.permissions_file_path,
            &env.permissions_file_ref,
        )
        .await
        .map_err(|e| ConfigError::Missing(format!("platform fetch failed: {e}")))?;

    decode_content(&file.content, &file.encoding)
}

/// Decode fetched file content per its declared encoding.
pub fn decode_content(content: &str, encoding: &str) -> ConfigResult<String> {
    match encoding {
        "base64" => {
            let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = BASE64
                .decode(stripped)
                .map_err(|e| ConfigError::Malformed(format!("base64 decode failed: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| ConfigError::Malformed(format!("permissions file is not utf-8: {e}")))
        }
        "utf-8" | "utf8" | "" => Ok(content.to_string()),
        other => Err(ConfigError::Malformed(format!(
            "unsupported content encoding: {other}"
        ))),
    }
}
