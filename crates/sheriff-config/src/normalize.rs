//! Legacy team-shape expansion.
//!
//! Two declaration shapes predate the concrete one: `formation` (union of
//! other teams in the same org) and `reference` (mirror of a team declared
//! in another org of the same document). A single pass here resolves both
//! into [`TeamDecl::Concrete`]; declarations that cannot be resolved are
//! left in place for validation to report by name.

use std::collections::BTreeSet;

use crate::model::{OrganizationConfig, TeamConfig, TeamDecl};

/// Resolve formation and reference declarations in place.
///
/// Formations may be built from other formations and references may point at
/// formations, so resolution iterates to a fixpoint; anything still
/// unresolved afterwards is a dangling declaration.
pub fn expand(orgs: &mut [OrganizationConfig]) {
    loop {
        let resolutions = collect_resolutions(orgs);
        if resolutions.is_empty() {
            return;
        }
        for (org_idx, decl_idx, team) in resolutions {
            orgs[org_idx].team_decls[decl_idx] = TeamDecl::Concrete(team);
        }
    }
}

fn collect_resolutions(orgs: &[OrganizationConfig]) -> Vec<(usize, usize, TeamConfig)> {
    let mut resolutions = Vec::new();

    for (org_idx, org) in orgs.iter().enumerate() {
        for (decl_idx, decl) in org.team_decls.iter().enumerate() {
            match decl {
                TeamDecl::Concrete(_) => {}
                TeamDecl::Formation(formation) => {
                    if let Some(team) = expand_formation(org, formation) {
                        resolutions.push((org_idx, decl_idx, team));
                    }
                }
                TeamDecl::Reference(reference) => {
                    if let Some(team) = expand_reference(orgs, reference) {
                        resolutions.push((org_idx, decl_idx, team));
                    }
                }
            }
        }
    }

    resolutions
}

/// Union of the constituent teams: maintainers are the union of their
/// maintainers, members the union of their members minus the maintainers.
fn expand_formation(
    org: &OrganizationConfig,
    formation: &crate::model::FormationTeam,
) -> Option<TeamConfig> {
    let mut maintainers = BTreeSet::new();
    let mut members = BTreeSet::new();

    for constituent_name in &formation.formation {
        let constituent = org.team(constituent_name)?;
        maintainers.extend(constituent.maintainers.iter().cloned());
        members.extend(constituent.members.iter().cloned());
    }

    let members = members.difference(&maintainers).cloned().collect();
    Some(TeamConfig {
        name: formation.name.clone(),
        members,
        maintainers,
        parent: None,
        secret: None,
        display_name: formation.display_name.clone(),
        gsuite: formation.gsuite.clone(),
        slack: formation.slack.clone(),
    })
}

/// Mirror of `<org>/<team>` declared elsewhere in the document. Fields set
/// on the declaration win over the mirrored ones.
fn expand_reference(
    orgs: &[OrganizationConfig],
    reference: &crate::model::ReferenceTeam,
) -> Option<TeamConfig> {
    let (target_org, target_team) = reference.reference.split_once('/')?;
    let org = orgs.iter().find(|o| o.organization == target_org)?;
    let team = org.team(target_team)?;

    Some(TeamConfig {
        name: reference.name.clone(),
        members: team.members.clone(),
        maintainers: team.maintainers.clone(),
        parent: None,
        secret: None,
        display_name: reference.display_name.clone().or_else(|| team.display_name.clone()),
        gsuite: reference.gsuite.clone().or_else(|| team.gsuite.clone()),
        slack: reference.slack.clone().or_else(|| team.slack.clone()),
    })
}
