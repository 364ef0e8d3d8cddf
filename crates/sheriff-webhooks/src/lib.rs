//! Real-time enforcement of the permissions document.
//!
//! The webhook receiver hands every delivery to [`EnforcementEngine`],
//! which classifies it, applies corrective mutations where the document
//! says the observed change is wrong, and narrates to the alert sink.
//! Pull requests against the config repository are routed to the
//! [`DryRunHarness`] instead.

pub mod ansi;
pub mod dryrun;
pub mod enforcement;
pub mod engine;
pub mod error;
pub mod events;
pub mod releases;
pub mod signature;

pub use dryrun::DryRunHarness;
pub use engine::EnforcementEngine;
pub use error::{WebhookError, WebhookResult};
pub use signature::verify_signature;
