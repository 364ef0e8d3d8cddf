//! The permissions document: model, loading, normalization and validation.
//!
//! A single YAML document declares the desired state of one or more GitHub
//! organizations. This crate parses it, expands the two legacy team shapes
//! (`formation`, `reference`) into concrete teams, resolves ruleset name
//! references, and enforces every schema and cross-entity invariant before
//! the reconciler is allowed to see the document.

pub mod env;
pub mod error;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod validate;

pub use env::{ReleaserPolicy, SheriffEnv};
pub use error::{ConfigError, ConfigResult};
pub use loader::load_from_str;
pub use model::{
    CustomProperty, GsuitePrivacy, OrganizationConfig, PermissionsConfig, PropertyType,
    PropertyValue, RepositoryConfig, RepositoryDefaults, RuleToken, RulesetConfig, RulesetEntry,
    TeamConfig, TeamDecl, Visibility,
};
