//! Conversion of declared rulesets into the upstream wire shape.

use serde_json::json;
use sheriff_config::{RuleToken, RulesetConfig};
use sheriff_github::types::{
    BypassActor, GitHubTeam, RefNameCondition, RepoRuleset, RulesetConditions, WireRule,
};

/// Wire `type` string for a boolean rule token.
fn rule_type(token: RuleToken) -> &'static str {
    match token {
        RuleToken::RequireLinearHistory => "required_linear_history",
        RuleToken::RequireSignedCommits => "required_signatures",
        RuleToken::RestrictCreation => "creation",
        RuleToken::RestrictDeletion => "deletion",
        RuleToken::RestrictUpdate => "update",
        RuleToken::RestrictForcePush => "non_fast_forward",
    }
}

/// Normalize a declared ruleset into the canonical wire shape.
///
/// `teams` is the observed org team list, used to resolve bypass team names
/// to actor ids. A name that cannot be resolved (a team created earlier in
/// the same dry run) maps to the sentinel id `-1`.
#[must_use]
pub fn normalize_declared(declared: &RulesetConfig, teams: &[GitHubTeam]) -> RepoRuleset {
    let mut rules: Vec<WireRule> = declared
        .rules
        .iter()
        .map(|token| WireRule {
            rule_type: rule_type(*token).to_string(),
            parameters: None,
        })
        .collect();

    if let Some(pr) = &declared.require_pull_request {
        rules.push(WireRule {
            rule_type: "pull_request".to_string(),
            parameters: Some(json!({
                "dismiss_stale_reviews_on_push": pr.dismiss_stale_reviews_on_push.unwrap_or(false),
                "require_code_owner_review": pr.require_code_owner_review.unwrap_or(false),
                "require_last_push_approval": pr.require_last_push_approval.unwrap_or(false),
                "required_approving_review_count": pr.required_approving_review_count.unwrap_or(0),
                "required_review_thread_resolution": pr
                    .required_review_thread_resolution
                    .unwrap_or(false),
                "allowed_merge_methods": pr
                    .allowed_merge_methods
                    .clone()
                    .unwrap_or_else(|| vec!["squash".to_string()]),
            })),
        });
    }

    if let Some(checks) = &declared.require_status_checks {
        rules.push(WireRule {
            rule_type: "required_status_checks".to_string(),
            parameters: Some(json!({
                "strict_required_status_checks_policy": false,
                "required_status_checks": checks
                    .iter()
                    .map(|check| json!({
                        "context": check.context,
                        "integration_id": check.app_id,
                    }))
                    .collect::<Vec<_>>(),
            })),
        });
    }

    rules.sort_by(|a, b| a.rule_type.cmp(&b.rule_type));

    let mut bypass_actors = Vec::new();
    if let Some(bypass) = &declared.bypass {
        for app_id in bypass.apps.iter().flatten() {
            bypass_actors.push(BypassActor {
                actor_id: *app_id,
                actor_type: "Integration".to_string(),
                bypass_mode: "always".to_string(),
            });
        }
        for team_name in bypass.teams.iter().flatten() {
            let actor_id = teams
                .iter()
                .find(|t| t.name == *team_name || t.slug == *team_name)
                .map_or(-1, |t| t.id);
            bypass_actors.push(BypassActor {
                actor_id,
                actor_type: "Team".to_string(),
                bypass_mode: "always".to_string(),
            });
        }
    }
    sort_bypass_actors(&mut bypass_actors);

    RepoRuleset {
        id: None,
        name: declared.name.clone(),
        target: declared.target.as_str().to_string(),
        enforcement: declared.enforcement.as_str().to_string(),
        bypass_actors,
        conditions: RulesetConditions {
            ref_name: RefNameCondition {
                include: declared.ref_name.include.clone(),
                exclude: declared.ref_name.exclude.clone().unwrap_or_default(),
            },
        },
        rules,
    }
}

/// Project an observed ruleset into the canonical shape: identical sorting,
/// upstream-only noise stripped, the id dropped.
#[must_use]
pub fn project_observed(mut observed: RepoRuleset) -> RepoRuleset {
    observed.id = None;
    observed.rules.sort_by(|a, b| a.rule_type.cmp(&b.rule_type));
    sort_bypass_actors(&mut observed.bypass_actors);

    for rule in &mut observed.rules {
        if rule.rule_type == "pull_request" {
            if let Some(serde_json::Value::Object(params)) = &mut rule.parameters {
                params.remove("automatic_copilot_code_review_enabled");
            }
        }
    }
    observed
}

fn sort_bypass_actors(actors: &mut [BypassActor]) {
    actors.sort_by(|a, b| {
        a.actor_type
            .cmp(&b.actor_type)
            .then(a.actor_id.cmp(&b.actor_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheriff_config::model::{
        BypassConfig, Enforcement, PullRequestRule, RefNamePattern, RulesetTarget, StatusCheck,
    };

    fn base_declared() -> RulesetConfig {
        RulesetConfig {
            name: "main-prot".into(),
            target: RulesetTarget::Branch,
            enforcement: Enforcement::Active,
            bypass: None,
            ref_name: RefNamePattern {
                include: vec!["refs/heads/main".into()],
                exclude: None,
            },
            rules: vec![RuleToken::RequireSignedCommits, RuleToken::RestrictForcePush],
            require_pull_request: None,
            require_status_checks: None,
        }
    }

    fn team(id: i64, name: &str) -> GitHubTeam {
        GitHubTeam {
            id,
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            privacy: "closed".into(),
            parent: None,
            permissions: None,
        }
    }

    #[test]
    fn rule_tokens_map_and_sort() {
        let normalized = normalize_declared(&base_declared(), &[]);
        let types: Vec<&str> = normalized.rules.iter().map(|r| r.rule_type.as_str()).collect();
        // Sorted lexicographically by type.
        assert_eq!(types, vec!["non_fast_forward", "required_signatures"]);
        assert_eq!(normalized.enforcement, "active");
        assert_eq!(normalized.conditions.ref_name.exclude, Vec::<String>::new());
    }

    #[test]
    fn pull_request_rule_backfills_defaults() {
        let mut declared = base_declared();
        declared.rules.clear();
        declared.require_pull_request = Some(PullRequestRule {
            required_approving_review_count: Some(2),
            ..Default::default()
        });

        let normalized = normalize_declared(&declared, &[]);
        let params = normalized.rules[0].parameters.as_ref().unwrap();
        assert_eq!(params["required_approving_review_count"], 2);
        assert_eq!(params["dismiss_stale_reviews_on_push"], false);
        assert_eq!(params["allowed_merge_methods"], json!(["squash"]));
    }

    #[test]
    fn status_checks_map_to_integration_ids() {
        let mut declared = base_declared();
        declared.rules.clear();
        declared.require_status_checks = Some(vec![StatusCheck {
            context: "build".into(),
            app_id: Some(15368),
        }]);

        let normalized = normalize_declared(&declared, &[]);
        let params = normalized.rules[0].parameters.as_ref().unwrap();
        assert_eq!(params["strict_required_status_checks_policy"], false);
        assert_eq!(
            params["required_status_checks"][0],
            json!({"context": "build", "integration_id": 15368})
        );
    }

    #[test]
    fn bypass_actors_sort_by_type_then_id() {
        let mut declared = base_declared();
        declared.bypass = Some(BypassConfig {
            teams: Some(vec!["Release Team".into(), "admins".into()]),
            apps: Some(vec![99, 12]),
        });

        let teams = vec![team(7, "admins"), team(3, "Release Team")];
        let normalized = normalize_declared(&declared, &teams);
        let actors: Vec<(String, i64)> = normalized
            .bypass_actors
            .iter()
            .map(|a| (a.actor_type.clone(), a.actor_id))
            .collect();
        assert_eq!(
            actors,
            vec![
                ("Integration".to_string(), 12),
                ("Integration".to_string(), 99),
                ("Team".to_string(), 3),
                ("Team".to_string(), 7),
            ]
        );
        assert!(normalized.bypass_actors.iter().all(|a| a.bypass_mode == "always"));
    }

    #[test]
    fn unresolvable_bypass_team_gets_sentinel_id() {
        let mut declared = base_declared();
        declared.bypass = Some(BypassConfig {
            teams: Some(vec!["just-created".into()]),
            apps: None,
        });
        let normalized = normalize_declared(&declared, &[]);
        assert_eq!(normalized.bypass_actors[0].actor_id, -1);
    }

    #[test]
    fn observed_projection_strips_copilot_noise() {
        let observed = RepoRuleset {
            id: Some(9),
            name: "main-prot".into(),
            target: "branch".into(),
            enforcement: "active".into(),
            bypass_actors: vec![],
            conditions: RulesetConditions {
                ref_name: RefNameCondition {
                    include: vec!["refs/heads/main".into()],
                    exclude: vec![],
                },
            },
            rules: vec![WireRule {
                rule_type: "pull_request".into(),
                parameters: Some(json!({
                    "required_approving_review_count": 0,
                    "automatic_copilot_code_review_enabled": true,
                })),
            }],
        };

        let projected = project_observed(observed);
        assert_eq!(projected.id, None);
        let params = projected.rules[0].parameters.as_ref().unwrap();
        assert!(params.get("automatic_copilot_code_review_enabled").is_none());
        assert_eq!(params["required_approving_review_count"], 0);
    }

    #[test]
    fn matching_declared_and_observed_normalize_equal() {
        let declared = base_declared();
        let normalized = normalize_declared(&declared, &[]);

        // Observed comes back with an id and shuffled rule order.
        let mut observed = normalized.clone();
        observed.id = Some(31);
        observed.rules.reverse();
        assert_eq!(project_observed(observed), normalized);
    }
}
