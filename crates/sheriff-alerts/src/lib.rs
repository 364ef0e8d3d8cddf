//! Alerting for sheriff.
//!
//! The engine narrates everything it does (and everything it refuses to do)
//! as block-structured messages. [`MessageBuilder`] assembles them,
//! [`AlertSink`] implementations deliver them: the Slack webhook transport
//! in production, an in-memory recorder in tests.

pub mod blocks;
pub mod message;
pub mod sink;

pub use blocks::Block;
pub use message::{EnforcementOutcome, Message, MessageBuilder, Severity};
pub use sink::{AlertError, AlertSink, DynAlertSink, LogSink, MemorySink, SlackWebhookSink};
