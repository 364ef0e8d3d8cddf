//! Schema and cross-entity validation of the permissions document.
//!
//! Runs after [`crate::normalize::expand`]. Every check reports the
//! offending org/team/repo by name; the first failure aborts the run.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    CustomProperty, OrganizationConfig, PropertyType, PropertyValue, RepositoryConfig,
    RulesetConfig, RulesetEntry, TeamConfig, TeamDecl,
};

/// Validate every org in place. Ruleset name references are replaced with
/// the concrete ruleset drawn from `common_rulesets` as a side effect.
pub fn validate(orgs: &mut [OrganizationConfig]) -> ConfigResult<()> {
    for org in orgs.iter_mut() {
        validate_org(org)?;
    }
    Ok(())
}

fn validate_org(org: &mut OrganizationConfig) -> ConfigResult<()> {
    if org.organization.is_empty() {
        return Err(ConfigError::invalid("organization", "empty organization name"));
    }

    resolve_ruleset_references(org)?;

    let org_name = org.organization.clone();
    validate_teams(&org_name, org)?;
    validate_custom_properties(&org_name, &org.custom_properties)?;
    validate_repositories(&org_name, org)?;
    Ok(())
}

/// Replace every `RulesetEntry::Reference` with the ruleset of that name
/// from `common_rulesets`.
fn resolve_ruleset_references(org: &mut OrganizationConfig) -> ConfigResult<()> {
    let common: HashMap<String, RulesetConfig> = org
        .common_rulesets
        .iter()
        .map(|r| (r.name.clone(), r.clone()))
        .collect();

    for repo in &mut org.repositories {
        for entry in &mut repo.ruleset_entries {
            if let RulesetEntry::Reference(name) = entry {
                let ruleset = common.get(name.as_str()).ok_or_else(|| {
                    ConfigError::invalid(
                        "ruleset",
                        format!(
                            "org {} repo {} references unknown common ruleset {name}",
                            org.organization, repo.name
                        ),
                    )
                })?;
                *entry = RulesetEntry::Inline(ruleset.clone());
            }
        }
    }
    Ok(())
}

fn validate_teams(org_name: &str, org: &OrganizationConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for decl in &org.team_decls {
        if !seen.insert(decl.name().to_string()) {
            return Err(ConfigError::invalid(
                "team",
                format!("org {org_name}: duplicate team name {}", decl.name()),
            ));
        }
        match decl {
            TeamDecl::Concrete(team) => validate_team(org_name, org, team)?,
            TeamDecl::Formation(f) => {
                return Err(ConfigError::invalid(
                    "team",
                    format!(
                        "org {org_name} team {}: formation names unknown team(s) {:?}",
                        f.name, f.formation
                    ),
                ));
            }
            TeamDecl::Reference(r) => {
                return Err(ConfigError::invalid(
                    "team",
                    format!(
                        "org {org_name} team {}: unresolvable reference {}",
                        r.name, r.reference
                    ),
                ));
            }
        }
    }

    // Parent-chain checks need the full team set; run after uniqueness.
    for team in org.teams() {
        validate_parent_chain(org_name, org, team)?;
    }
    Ok(())
}

fn validate_team(org_name: &str, org: &OrganizationConfig, team: &TeamConfig) -> ConfigResult<()> {
    let context = format!("org {org_name} team {}", team.name);

    if team.name.is_empty() {
        return Err(ConfigError::invalid("team", format!("org {org_name}: empty team name")));
    }
    if team.maintainers.is_empty() {
        return Err(ConfigError::invalid(
            "team",
            format!("{context}: a team needs at least one maintainer"),
        ));
    }

    let overlap: BTreeSet<_> = team.members.intersection(&team.maintainers).collect();
    if !overlap.is_empty() {
        return Err(ConfigError::invalid(
            "team",
            format!("{context}: logins {overlap:?} are both members and maintainers"),
        ));
    }

    if team.gsuite.is_some() && team.display_name.is_none() {
        return Err(ConfigError::invalid(
            "team",
            format!("{context}: gsuite requires displayName"),
        ));
    }

    if let Some(parent_name) = &team.parent {
        if team.is_secret() {
            return Err(ConfigError::invalid(
                "team",
                format!("{context}: a secret team cannot have a parent"),
            ));
        }
        let parent = org.team(parent_name).ok_or_else(|| {
            ConfigError::invalid("team", format!("{context}: unknown parent {parent_name}"))
        })?;
        if parent.is_secret() {
            return Err(ConfigError::invalid(
                "team",
                format!("{context}: parent {parent_name} is secret and cannot be a parent"),
            ));
        }
    }

    for login in team.all_logins() {
        if login.is_empty() {
            return Err(ConfigError::invalid("team", format!("{context}: empty login")));
        }
    }
    Ok(())
}

fn validate_parent_chain(
    org_name: &str,
    org: &OrganizationConfig,
    team: &TeamConfig,
) -> ConfigResult<()> {
    let mut visited = HashSet::from([team.name.as_str()]);
    let mut current = team;
    while let Some(parent_name) = &current.parent {
        if !visited.insert(parent_name.as_str()) {
            return Err(ConfigError::invalid(
                "team",
                format!(
                    "org {org_name} team {}: cycle in parent chain at {parent_name}",
                    team.name
                ),
            ));
        }
        match org.team(parent_name) {
            Some(parent) => current = parent,
            // Unknown parents were already reported per-team.
            None => return Ok(()),
        }
    }
    Ok(())
}

fn validate_custom_properties(org_name: &str, properties: &[CustomProperty]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for property in properties {
        let context = format!("org {org_name} custom property {}", property.property_name);

        if property.property_name.is_empty() {
            return Err(ConfigError::invalid(
                "custom_property",
                format!("org {org_name}: empty property name"),
            ));
        }
        if !seen.insert(property.property_name.as_str()) {
            return Err(ConfigError::invalid(
                "custom_property",
                format!("{context}: duplicate definition"),
            ));
        }

        let is_select = matches!(
            property.value_type,
            PropertyType::SingleSelect | PropertyType::MultiSelect
        );
        match &property.allowed_values {
            Some(values) => {
                if !is_select {
                    return Err(ConfigError::invalid(
                        "custom_property",
                        format!("{context}: allowed_values is only valid for select types"),
                    ));
                }
                if values.is_empty() {
                    return Err(ConfigError::invalid(
                        "custom_property",
                        format!("{context}: allowed_values must not be empty"),
                    ));
                }
            }
            None => {
                if is_select {
                    return Err(ConfigError::invalid(
                        "custom_property",
                        format!("{context}: select types require allowed_values"),
                    ));
                }
            }
        }

        if let Some(default) = &property.default_value {
            validate_property_value(&context, property, default)?;
        }
    }
    Ok(())
}

/// Shared shape/membership check for default values and per-repo values.
fn validate_property_value(
    context: &str,
    property: &CustomProperty,
    value: &PropertyValue,
) -> ConfigResult<()> {
    let elements: Vec<&String> = match (property.value_type, value) {
        (PropertyType::MultiSelect, PropertyValue::Multiple(list)) => list.iter().collect(),
        (PropertyType::MultiSelect, PropertyValue::Single(_)) => {
            return Err(ConfigError::invalid(
                "custom_property",
                format!("{context}: multi_select values must be arrays"),
            ));
        }
        (_, PropertyValue::Multiple(_)) => {
            return Err(ConfigError::invalid(
                "custom_property",
                format!("{context}: only multi_select values may be arrays"),
            ));
        }
        (_, PropertyValue::Single(s)) => vec![s],
    };

    if let Some(allowed) = &property.allowed_values {
        for element in elements {
            if !allowed.contains(element) {
                return Err(ConfigError::invalid(
                    "custom_property",
                    format!("{context}: value {element:?} is not in allowed_values"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_repositories(org_name: &str, org: &OrganizationConfig) -> ConfigResult<()> {
    let team_names: HashSet<&str> = org.teams().map(|t| t.name.as_str()).collect();
    let properties: HashMap<&str, &CustomProperty> = org
        .custom_properties
        .iter()
        .map(|p| (p.property_name.as_str(), p))
        .collect();

    let mut seen = HashSet::new();
    for repo in &org.repositories {
        let context = format!("org {org_name} repo {}", repo.name);

        if repo.name.is_empty() {
            return Err(ConfigError::invalid(
                "repository",
                format!("org {org_name}: empty repository name"),
            ));
        }
        if !seen.insert(repo.name.as_str()) {
            return Err(ConfigError::invalid(
                "repository",
                format!("{context}: duplicate repository"),
            ));
        }

        for team_name in repo.teams.keys() {
            if !team_names.contains(team_name.as_str()) {
                return Err(ConfigError::invalid(
                    "repository",
                    format!("{context}: grants access to unknown team {team_name}"),
                ));
            }
        }

        for (property_name, value) in &repo.properties {
            let property = properties.get(property_name.as_str()).ok_or_else(|| {
                ConfigError::invalid(
                    "repository",
                    format!("{context}: sets undeclared custom property {property_name}"),
                )
            })?;
            validate_property_value(&context, property, value)?;
        }

        validate_repo_rulesets(&context, &team_names, repo)?;
    }
    Ok(())
}

fn validate_repo_rulesets(
    context: &str,
    team_names: &HashSet<&str>,
    repo: &RepositoryConfig,
) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for ruleset in repo.rulesets() {
        let ruleset_context = format!("{context} ruleset {}", ruleset.name);

        if ruleset.name.is_empty() {
            return Err(ConfigError::invalid("ruleset", format!("{context}: empty ruleset name")));
        }
        if !seen.insert(ruleset.name.as_str()) {
            return Err(ConfigError::invalid(
                "ruleset",
                format!("{ruleset_context}: duplicate ruleset name"),
            ));
        }
        if ruleset.ref_name.include.is_empty() {
            return Err(ConfigError::invalid(
                "ruleset",
                format!("{ruleset_context}: ref_name.include must not be empty"),
            ));
        }

        let mut rule_tokens = HashSet::new();
        for token in &ruleset.rules {
            if !rule_tokens.insert(token) {
                return Err(ConfigError::invalid(
                    "ruleset",
                    format!("{ruleset_context}: duplicate rule {token:?}"),
                ));
            }
        }

        if let Some(bypass) = &ruleset.bypass {
            let has_teams = bypass.teams.as_ref().is_some_and(|t| !t.is_empty());
            let has_apps = bypass.apps.as_ref().is_some_and(|a| !a.is_empty());
            if !has_teams && !has_apps {
                return Err(ConfigError::invalid(
                    "ruleset",
                    format!("{ruleset_context}: bypass needs at least one of teams or apps"),
                ));
            }
            for team_name in bypass.teams.iter().flatten() {
                if !team_names.contains(team_name.as_str()) {
                    return Err(ConfigError::invalid(
                        "ruleset",
                        format!("{ruleset_context}: bypass names unknown team {team_name}"),
                    ));
                }
            }
        }
    }
    Ok(())
}
