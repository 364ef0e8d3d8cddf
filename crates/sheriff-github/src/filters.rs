//! Repositories the engine must never touch or report.
//!
//! Two filters apply before any repository is enumerated, mutated or named
//! in an alert: a poison list of name hashes, and the naming pattern of
//! security-advisory forks.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// SHA-256 hex digests of repository names that trip platform bugs when
/// mutated. The names themselves are withheld on purpose.
pub const GLITCHED_REPO_HASHES: &[&str] = &[
    "49e40a2080cc26d69743401c1df86ae196f7c6aaf1d8b624b54ee0e1b9a6f5e0",
    "b4c1f1b3b1cb23a405946a8a4c9e2a92f75dbb3aea9ff319b5e656d5b7e2b37a",
    "e50bee0300c9b54de5d1ed5d73ff50d1db8f2a1f6a0f0f95e1c15729d17836d1",
];

fn glitched_hashes() -> &'static HashSet<&'static str> {
    static HASHES: OnceLock<HashSet<&'static str>> = OnceLock::new();
    HASHES.get_or_init(|| GLITCHED_REPO_HASHES.iter().copied().collect())
}

fn advisory_fork_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[\w]+-ghsa-[A-Za-z0-9-]{4}-[A-Za-z0-9-]{4}-[A-Za-z0-9-]{4}$")
            .expect("advisory fork pattern is valid")
    })
}

/// Whether the repository name hashes into the poison list.
#[must_use]
pub fn is_glitched_repo(name: &str) -> bool {
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    glitched_hashes().contains(digest.as_str())
}

/// Whether the repository is a temporary security-advisory fork.
#[must_use]
pub fn is_security_advisory_fork(name: &str) -> bool {
    advisory_fork_regex().is_match(name)
}

/// Whether the repository may be enumerated, mutated and reported at all.
#[must_use]
pub fn is_visible_repo(name: &str) -> bool {
    !is_glitched_repo(name) && !is_security_advisory_fork(name)
}
