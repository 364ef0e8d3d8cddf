//! GitHub platform access for sheriff.
//!
//! This crate owns everything that talks to the platform:
//! - typed wire structures for the REST and GraphQL surfaces sheriff uses
//! - the [`GitHubClient`] trait and its reqwest-backed [`RestClient`]
//! - credential narrowing via [`CredentialProvider`]
//! - per-org memoization of clients and fleet listings ([`ClientCache`])
//! - the poison-list and security-advisory repository filters

pub mod access;
pub mod cache;
pub mod client;
pub mod credentials;
pub mod error;
pub mod filters;
pub mod rest;
pub mod types;

pub use access::AccessLevel;
pub use cache::ClientCache;
pub use client::{DynGitHubClient, GitHubClient};
pub use credentials::{CredentialProvider, StaticTokenProvider};
pub use error::{GitHubError, GitHubResult};
pub use rest::RestClient;
