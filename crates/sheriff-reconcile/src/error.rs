//! Reconciler errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] sheriff_config::ConfigError),

    /// A read against the platform failed. Fatal to the org being
    /// reconciled; previously issued writes stay in place.
    #[error(transparent)]
    GitHub(#[from] sheriff_github::GitHubError),

    #[error(transparent)]
    Alert(#[from] sheriff_alerts::AlertError),

    /// A cross-entity invariant failed at runtime (unknown user, login
    /// casing drift). Halts the org after a critical alert.
    #[error("policy violation in org {org}: {message}")]
    Policy { org: String, message: String },

    /// The platform returned more than one team for a declared name.
    #[error("org {org}: team name {name} matches more than one upstream team")]
    AmbiguousTeam { org: String, name: String },
}

impl ReconcileError {
    pub fn policy(org: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Policy {
            org: org.into(),
            message: message.into(),
        }
    }
}

pub type ReconcileResult<T> = std::result::Result<T, ReconcileError>;
