//! Error types for platform access.

use thiserror::Error;

/// Errors surfaced by the GitHub client stack.
///
/// Rate limiting and transient transport hiccups are retried inside the
/// client; by the time an error reaches a caller it is final for that call.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// Credentials were rejected outright (HTTP 401).
    #[error("authentication expired or rejected: {0}")]
    AuthExpired(String),

    /// Credentials are valid but lack a required scope (HTTP 403).
    #[error("insufficient authorization: {0}")]
    AuthInsufficient(String),

    /// Secondary or primary rate limit exhausted after client-side retries.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The requested entity does not exist (HTTP 404).
    #[error("{resource} not found{}", id.as_ref().map(|i| format!(": {i}")).unwrap_or_default())]
    NotFound {
        /// Entity kind, e.g. "team" or "repository".
        resource: String,
        /// Identifier when one is known.
        id: Option<String>,
    },

    /// Any other non-success API response.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A mutating call was issued on a read-only client.
    #[error("mutation refused: client for {org} is read-only")]
    ReadOnly { org: String },

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl GitHubError {
    /// Shorthand for a [`GitHubError::NotFound`] with an id.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    /// Whether this error is a 404 on an expected entity. The reconciler
    /// treats those as cache-consistency noise and continues.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used throughout the platform layer.
pub type GitHubResult<T> = std::result::Result<T, GitHubError>;
