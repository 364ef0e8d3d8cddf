//! Canonical config generation from live org state.
//!
//! Reads an org's teams, memberships, repositories, grants and custom
//! properties, and emits a permissions document that reconciles to zero
//! mutations against the same org: teams sorted by name, repos sorted by
//! name, maps with sorted keys.

use std::collections::{BTreeMap, BTreeSet};

use sheriff_config::model::{
    CustomProperty, OrganizationConfig, PropertyType, PropertyValue, RepositoryConfig,
    RepositoryDefaults, RepositorySettings, TeamConfig, TeamDecl, Visibility,
};
use sheriff_github::filters::is_visible_repo;
use sheriff_github::types::{CustomPropertySchema, TeamRole};
use sheriff_github::{AccessLevel, ClientCache};

use crate::error::ReconcileResult;

/// Read the live state of `org` and emit the canonical YAML document.
pub async fn generate_org_config(cache: &ClientCache, org: &str) -> ReconcileResult<String> {
    let client = cache.client(org, true).await?;

    let mut teams = Vec::new();
    for observed in cache.teams(org).await?.iter() {
        let maintainers: BTreeSet<String> = client
            .team_members_by_role(org, &observed.slug, TeamRole::Maintainer)
            .await?
            .into_iter()
            .collect();
        let members: BTreeSet<String> = client
            .team_members_by_role(org, &observed.slug, TeamRole::Member)
            .await?
            .into_iter()
            .filter(|login| !maintainers.contains(login))
            .collect();

        teams.push(TeamConfig {
            name: observed.name.clone(),
            members,
            maintainers,
            parent: observed.parent.as_ref().map(|p| p.name.clone()),
            secret: (observed.privacy == "secret").then_some(true),
            display_name: None,
            gsuite: None,
            slack: None,
        });
    }
    teams.sort_by(|a, b| a.name.cmp(&b.name));

    let custom_properties: Vec<CustomProperty> = client
        .list_custom_properties(org)
        .await?
        .iter()
        .filter_map(schema_to_declared)
        .collect();

    let mut repositories = Vec::new();
    for observed in cache.repos(org).await?.iter() {
        if !is_visible_repo(&observed.name) || observed.archived {
            continue;
        }

        let mut team_grants: BTreeMap<String, AccessLevel> = BTreeMap::new();
        for team in client.list_repo_teams(org, &observed.name).await? {
            if let Some(level) = team.permissions.as_ref().and_then(AccessLevel::from_flags) {
                team_grants.insert(team.name, level);
            }
        }

        let mut collaborators: BTreeMap<String, AccessLevel> = BTreeMap::new();
        for collaborator in client.list_direct_collaborators(org, &observed.name).await? {
            if let Some(level) = AccessLevel::from_flags(&collaborator.permissions) {
                collaborators.insert(collaborator.login, level);
            }
        }

        let mut properties: BTreeMap<String, PropertyValue> = BTreeMap::new();
        if !custom_properties.is_empty() {
            for value in client.get_repo_properties(org, &observed.name).await? {
                if let Some(property_value) = json_to_property_value(&value.value) {
                    properties.insert(value.property_name, property_value);
                }
            }
        }

        repositories.push(RepositoryConfig {
            name: observed.name.clone(),
            teams: team_grants,
            external_collaborators: collaborators,
            settings: Some(RepositorySettings {
                has_wiki: Some(observed.has_wiki),
                forks_need_actions_approval: None,
            }),
            visibility: if observed.private {
                Visibility::Private
            } else {
                Visibility::Public
            },
            properties,
            ruleset_entries: Vec::new(),
            heroku: None,
        });
    }
    repositories.sort_by(|a, b| a.name.cmp(&b.name));

    let config = OrganizationConfig {
        organization: org.to_string(),
        repository_defaults: RepositoryDefaults {
            has_wiki: true,
            forks_need_actions_approval: None,
        },
        team_decls: teams.into_iter().map(TeamDecl::Concrete).collect(),
        repositories,
        common_rulesets: Vec::new(),
        custom_properties,
    };

    serde_yaml::to_string(&config).map_err(|e| {
        sheriff_config::ConfigError::Malformed(format!("cannot serialize generated config: {e}"))
            .into()
    })
}

fn schema_to_declared(schema: &CustomPropertySchema) -> Option<CustomProperty> {
    let value_type = match schema.value_type.as_str() {
        "string" => PropertyType::String,
        "single_select" => PropertyType::SingleSelect,
        "multi_select" => PropertyType::MultiSelect,
        other => {
            tracing::warn!(property = %schema.property_name, value_type = other, "skipping custom property with unsupported type");
            return None;
        }
    };
    Some(CustomProperty {
        property_name: schema.property_name.clone(),
        value_type,
        required: schema.required.then_some(true),
        default_value: schema.default_value.as_ref().and_then(json_to_property_value),
        description: schema.description.clone(),
        allowed_values: schema.allowed_values.clone(),
    })
}

fn json_to_property_value(value: &serde_json::Value) -> Option<PropertyValue> {
    match value {
        serde_json::Value::String(s) => Some(PropertyValue::Single(s.clone())),
        serde_json::Value::Array(items) => Some(PropertyValue::Multiple(
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        )),
        _ => None,
    }
}
