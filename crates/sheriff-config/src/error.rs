//! Configuration errors.

use thiserror::Error;

/// Failure modes of loading and validating the permissions document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No source yielded a document: no local file, no fetchable remote.
    #[error("permissions file not found: {0}")]
    Missing(String),

    /// A document was found but is not parseable YAML of the expected shape.
    #[error("permissions file is malformed: {0}")]
    Malformed(String),

    /// The document parsed but violates a schema or cross-entity invariant.
    /// `kind` names the entity class, `message` names the offender.
    #[error("invalid config ({kind}): {message}")]
    Invalid { kind: String, message: String },
}

impl ConfigError {
    pub fn invalid(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Result alias for config operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
