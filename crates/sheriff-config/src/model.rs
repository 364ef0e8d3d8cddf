//! The permissions document model.
//!
//! Shapes mirror the YAML document. Team declarations are a tagged sum over
//! the concrete shape and two legacy shapes; [`crate::normalize`] resolves
//! everything to [`TeamDecl::Concrete`] before validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use sheriff_github::AccessLevel;

/// The whole document: one organization or an ordered list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionsConfig {
    Single(OrganizationConfig),
    Multiple(Vec<OrganizationConfig>),
}

impl PermissionsConfig {
    /// Flatten into the ordered org list.
    #[must_use]
    pub fn into_orgs(self) -> Vec<OrganizationConfig> {
        match self {
            Self::Single(org) => vec![org],
            Self::Multiple(orgs) => orgs,
        }
    }
}

/// Desired state of a single organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub organization: String,
    pub repository_defaults: RepositoryDefaults,
    #[serde(rename = "teams", default)]
    pub team_decls: Vec<TeamDecl>,
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_rulesets: Vec<RulesetConfig>,
    #[serde(rename = "customProperties", default, skip_serializing_if = "Vec::is_empty")]
    pub custom_properties: Vec<CustomProperty>,
}

impl OrganizationConfig {
    /// Concrete teams. Normalization resolves every declaration to
    /// [`TeamDecl::Concrete`]; anything else was already rejected by
    /// validation, so non-concrete declarations are simply skipped here.
    pub fn teams(&self) -> impl Iterator<Item = &TeamConfig> {
        self.team_decls.iter().filter_map(TeamDecl::as_concrete)
    }

    /// Look up a concrete team by name.
    #[must_use]
    pub fn team(&self, name: &str) -> Option<&TeamConfig> {
        self.teams().find(|t| t.name == name)
    }

    /// Look up a repository by name.
    #[must_use]
    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.name == name)
    }
}

/// Org-wide fallbacks applied field-by-field under `repo.settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryDefaults {
    pub has_wiki: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks_need_actions_approval: Option<bool>,
}

/// A team declaration: the concrete shape or one of the two legacy shapes.
///
/// `Formation` declares the union of other teams in the same org;
/// `Reference` mirrors a team declared in another org of the same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamDecl {
    Formation(FormationTeam),
    Reference(ReferenceTeam),
    Concrete(TeamConfig),
}

impl TeamDecl {
    #[must_use]
    pub fn as_concrete(&self) -> Option<&TeamConfig> {
        match self {
            Self::Concrete(team) => Some(team),
            _ => None,
        }
    }

    /// The declared team name, regardless of shape.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Formation(t) => &t.name,
            Self::Reference(t) => &t.name,
            Self::Concrete(t) => &t.name,
        }
    }
}

/// Legacy shape: union of other teams in the same org.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationTeam {
    pub name: String,
    pub formation: Vec<String>,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsuite: Option<GsuiteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackChannel>,
}

/// Legacy shape: mirror of `<org>/<team>` declared elsewhere in the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceTeam {
    pub name: String,
    pub reference: String,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsuite: Option<GsuiteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackChannel>,
}

/// A concrete team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub name: String,
    #[serde(default)]
    pub members: BTreeSet<String>,
    pub maintainers: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<bool>,
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsuite: Option<GsuiteConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack: Option<SlackChannel>,
}

impl TeamConfig {
    /// Whether the team is declared secret.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.secret.unwrap_or(false)
    }

    /// Upstream privacy string for this team.
    #[must_use]
    pub fn privacy(&self) -> &'static str {
        if self.is_secret() {
            "secret"
        } else {
            "closed"
        }
    }

    /// Every login the team names, in either role.
    pub fn all_logins(&self) -> impl Iterator<Item = &String> {
        self.maintainers.iter().chain(self.members.iter())
    }
}

/// Identity-directory group settings for a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GsuiteConfig {
    pub privacy: GsuitePrivacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GsuitePrivacy {
    Internal,
    External,
}

/// Chat user-group setting: `true` derives the handle from the team name,
/// a string sets it explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlackChannel {
    Enabled(bool),
    Named(String),
}

/// Desired state of a single repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub teams: BTreeMap<String, AccessLevel>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_collaborators: BTreeMap<String, AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<RepositorySettings>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(rename = "rulesets", default, skip_serializing_if = "Vec::is_empty")]
    pub ruleset_entries: Vec<RulesetEntry>,
    /// Hosting-service block, consumed by the heroku plugin. Opaque here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heroku: Option<serde_yaml::Value>,
}

impl RepositoryConfig {
    /// An undeclared-but-observed repository: visibility `current`, no
    /// granted permissions.
    #[must_use]
    pub fn untracked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            teams: BTreeMap::new(),
            external_collaborators: BTreeMap::new(),
            settings: None,
            visibility: Visibility::Current,
            properties: BTreeMap::new(),
            ruleset_entries: Vec::new(),
            heroku: None,
        }
    }

    /// Resolved rulesets. Validation replaces every name reference with the
    /// concrete ruleset drawn from `common_rulesets`.
    pub fn rulesets(&self) -> impl Iterator<Item = &RulesetConfig> {
        self.ruleset_entries.iter().filter_map(|entry| match entry {
            RulesetEntry::Inline(ruleset) => Some(ruleset),
            RulesetEntry::Reference(_) => None,
        })
    }

    /// Whether the repository declares any rulesets.
    #[must_use]
    pub fn declares_rulesets(&self) -> bool {
        !self.ruleset_entries.is_empty()
    }
}

/// Per-repository settings, falling back to [`RepositoryDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forks_need_actions_approval: Option<bool>,
}

/// Repository visibility intent. `Current` means "do not touch".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Current,
}

/// A ruleset entry on a repository: inline, or a name reference into the
/// org's `common_rulesets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RulesetEntry {
    Reference(String),
    Inline(RulesetConfig),
}

/// A declared branch/tag protection ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetConfig {
    pub name: String,
    pub target: RulesetTarget,
    #[serde(default)]
    pub enforcement: Enforcement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<BypassConfig>,
    pub ref_name: RefNamePattern,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_pull_request: Option<PullRequestRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_status_checks: Option<Vec<StatusCheck>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RulesetTarget {
    Branch,
    Tag,
}

impl RulesetTarget {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    Disabled,
    #[default]
    Active,
    Evaluate,
}

impl Enforcement {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Active => "active",
            Self::Evaluate => "evaluate",
        }
    }
}

/// Bypass actors: teams by name, apps by integration id. When the block is
/// present at least one of the two lists must be non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BypassConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teams: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<Vec<i64>>,
}

/// Ref-name matching for a ruleset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefNamePattern {
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

/// The six boolean rule tokens a ruleset may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleToken {
    RestrictCreation,
    RestrictUpdate,
    RestrictDeletion,
    RequireLinearHistory,
    RequireSignedCommits,
    RestrictForcePush,
}

/// Pull-request requirements on a ruleset. Unset fields take the upstream
/// defaults during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismiss_stale_reviews_on_push: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_code_owner_review: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_approving_review_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_review_thread_resolution: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_merge_methods: Option<Vec<String>>,
}

/// A required status check entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCheck {
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
}

/// An org custom property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomProperty {
    pub property_name: String,
    pub value_type: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    String,
    SingleSelect,
    MultiSelect,
}

/// A property value: scalar for `string`/`single_select`, array for
/// `multi_select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Single(String),
    Multiple(Vec<String>),
}

impl PropertyValue {
    /// JSON form as the properties endpoints expect it.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Single(s) => serde_json::Value::String(s.clone()),
            Self::Multiple(list) => {
                serde_json::Value::Array(list.iter().cloned().map(serde_json::Value::String).collect())
            }
        }
    }
}
