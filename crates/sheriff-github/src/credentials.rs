//! Credential narrowing.
//!
//! The engine never holds a token directly; it asks a [`CredentialProvider`]
//! for a client scoped to one org, flagged read-only wherever mutation is
//! not intended. When the global dry-run flag is set the provider forces
//! read-only regardless of what the caller asked for, so a dry run cannot
//! mutate even through a code path that forgot to check the flag.

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::DynGitHubClient;
use crate::error::GitHubResult;
use crate::rest::{RestClient, RestConfig};

/// Source of narrowed, authenticated platform clients.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// An authenticated client for `org`. `read_only` narrows the client so
    /// mutating calls fail at the transport seam.
    async fn client_for_org(&self, org: &str, read_only: bool) -> GitHubResult<DynGitHubClient>;

    /// Whether every issued client is forced read-only.
    fn dry_run(&self) -> bool;
}

/// Provider backed by a single installation token.
///
/// Token acquisition (app JWT exchange, refresh) happens upstream of this
/// crate; the provider receives a usable token and only handles narrowing.
pub struct StaticTokenProvider {
    token: String,
    base_url: Option<String>,
    dry_run: bool,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: impl Into<String>, dry_run: bool) -> Self {
        Self {
            token: token.into(),
            base_url: None,
            dry_run,
        }
    }

    /// Point issued clients at a different API root (tests, GHES).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn client_for_org(&self, _org: &str, read_only: bool) -> GitHubResult<DynGitHubClient> {
        let mut config = RestConfig::new(self.token.clone());
        if let Some(base_url) = &self.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if read_only || self.dry_run {
            config = config.read_only();
        }
        Ok(Arc::new(RestClient::new(config)?))
    }

    fn dry_run(&self) -> bool {
        self.dry_run
    }
}
