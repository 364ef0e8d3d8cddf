//! The reconciliation engine.
//!
//! Per organization, in order: custom-property sync, user invitation sync,
//! missing-repo warnings, orphan team deletion, team reconcile, repository
//! creation, concurrent metadata prefetch, repository reconcile, and plugin
//! fan-out. Every mutation is gated on the context's dry-run flag; gated
//! mutations are still narrated to the log and the alert sink.

pub mod context;
pub mod engine;
pub mod error;
pub mod generator;
pub mod invites;
pub mod plugins;
pub mod prefetch;
pub mod properties;
pub mod repos;
pub mod rulesets;
pub mod teams;

pub use context::{OrgReporter, ReconcileContext};
pub use engine::Reconciler;
pub use error::{ReconcileError, ReconcileResult};
pub use plugins::{PluginRegistry, SheriffPlugin};
