//! Wire structures for the slices of the GitHub API sheriff touches.
//!
//! Unknown fields are ignored on deserialization throughout; the upstream
//! payloads carry far more than the reconciler needs.

use serde::{Deserialize, Serialize};

use crate::access::AccessLevel;

/// A platform user as returned by the users and members endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Permissions bitmap attached to team and collaborator objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionFlags {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub maintain: bool,
    #[serde(default)]
    pub push: bool,
    #[serde(default)]
    pub triage: bool,
    #[serde(default)]
    pub pull: bool,
}

impl PermissionFlags {
    /// Bitmap with exactly the flags GitHub sets for the given base level.
    #[must_use]
    pub fn from_level(level: AccessLevel) -> Self {
        Self {
            admin: level >= AccessLevel::Admin,
            maintain: level >= AccessLevel::Maintain,
            push: level >= AccessLevel::Write,
            triage: level >= AccessLevel::Triage,
            pull: true,
        }
    }
}

/// A team as returned by the org teams listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubTeam {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// `secret` or `closed`.
    pub privacy: String,
    #[serde(default)]
    pub parent: Option<Box<GitHubTeam>>,
    /// Present on repo-scoped team listings.
    #[serde(default)]
    pub permissions: Option<PermissionFlags>,
}

/// A repository as returned by the org repos listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubRepository {
    pub id: i64,
    pub name: String,
    pub private: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub has_wiki: bool,
    #[serde(default)]
    pub stargazers_count: Option<u64>,
    #[serde(default)]
    pub owner: Option<GitHubUser>,
}

/// A direct collaborator on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collaborator {
    pub id: i64,
    pub login: String,
    pub permissions: PermissionFlags,
}

/// A pending repository invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInvitation {
    pub id: i64,
    pub invitee: GitHubUser,
    /// GitHub-native permission string (`read`, `triage`, `write`, ...).
    pub permissions: String,
}

/// A pending organization invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgInvitation {
    pub id: i64,
    #[serde(default)]
    pub login: Option<String>,
    pub role: String,
}

/// Role used when mutating team membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Member,
    Maintainer,
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member => write!(f, "member"),
            Self::Maintainer => write!(f, "maintainer"),
        }
    }
}

/// An organization custom property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertySchema {
    pub property_name: String,
    /// `string`, `single_select` or `multi_select`.
    pub value_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

/// A custom property value set on a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPropertyValue {
    pub property_name: String,
    pub value: serde_json::Value,
}

/// A ruleset in the shape the rulesets endpoints accept and return.
///
/// This is also the canonical shape the normalizer produces from config;
/// equality between a normalized declared ruleset and a normalized observed
/// one is what "no drift" means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoRuleset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    /// `branch` or `tag`.
    pub target: String,
    /// `disabled`, `active` or `evaluate`.
    pub enforcement: String,
    #[serde(default)]
    pub bypass_actors: Vec<BypassActor>,
    pub conditions: RulesetConditions,
    #[serde(default)]
    pub rules: Vec<WireRule>,
}

/// A bypass actor entry on a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassActor {
    pub actor_id: i64,
    /// `Integration` or `Team`.
    pub actor_type: String,
    pub bypass_mode: String,
}

/// Ref-name matching conditions on a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetConditions {
    pub ref_name: RefNameCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefNameCondition {
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A single rule entry on a ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRule {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// File content response from the contents endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    pub content: String,
    /// `base64` or `utf-8`.
    pub encoding: String,
}

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub tag_name: String,
    #[serde(default)]
    pub draft: bool,
}

/// Pull request fields the dry-run harness polls.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    pub head: CommitRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Input for creating or completing a check run.
#[derive(Debug, Clone, Serialize)]
pub struct CheckRunInput {
    pub name: String,
    pub head_sha: String,
    /// `in_progress` or `completed`.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<CheckRunOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// A created gist, reduced to the raw URL of its single file.
#[derive(Debug, Clone)]
pub struct CreatedGist {
    pub id: String,
    pub raw_url: String,
}

/// Patch for repository settings updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

/// Fields for creating a repository.
#[derive(Debug, Clone, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub has_wiki: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

/// Fields for creating a team. Declared maintainers ride the creation call
/// so a new team starts with its maintainer set instead of the creator.
#[derive(Debug, Clone, Serialize)]
pub struct NewTeam {
    pub name: String,
    /// `secret` or `closed`.
    pub privacy: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<String>,
}

/// Patch for team updates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_team_id: Option<i64>,
}
