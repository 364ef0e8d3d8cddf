//! Org invitation sync.
//!
//! Every login the document names must either be an org member or hold a
//! pending invitation by the time team membership sync runs. A login that
//! cannot be resolved on the platform, or whose canonical casing differs
//! from the document, is a policy violation that halts the org.

use std::collections::{BTreeSet, HashSet};

use sheriff_config::OrganizationConfig;
use sheriff_github::client::DynGitHubClient;

use crate::context::{OrgReporter, ReconcileContext};
use crate::error::{ReconcileError, ReconcileResult};

/// Returns the set of logins with a pending org invitation (pre-existing or
/// created here). Team sync skips add/promote for these.
pub async fn sync_user_invitations(
    ctx: &ReconcileContext,
    reporter: &mut OrgReporter,
    client: &DynGitHubClient,
    org: &OrganizationConfig,
) -> ReconcileResult<HashSet<String>> {
    let org_name = org.organization.as_str();

    let members: HashSet<String> = ctx
        .cache
        .org_members(org_name)
        .await?
        .iter()
        .map(|u| u.login.clone())
        .collect();

    let mut pending: HashSet<String> = client
        .list_org_invitations(org_name)
        .await?
        .into_iter()
        .filter_map(|invite| invite.login)
        .collect();

    // BTreeSet for a deterministic invitation order.
    let declared: BTreeSet<&String> = org.teams().flat_map(|t| t.all_logins()).collect();

    for login in declared {
        if members.contains(login) || pending.contains(login) {
            continue;
        }

        let user = match client.get_user(login).await {
            Ok(user) => user,
            Err(err) if err.is_not_found() => {
                reporter.critical(format!(
                    "User `{login}` is in the permissions file for `{org_name}` but does not exist on GitHub"
                ));
                return Err(ReconcileError::policy(
                    org_name,
                    format!("user {login} not found on the platform"),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        if user.login != *login {
            reporter.critical(format!(
                "User `{login}` is cased `{}` on GitHub; fix the permissions file before reconciling `{org_name}`",
                user.login
            ));
            return Err(ReconcileError::policy(
                org_name,
                format!("login casing mismatch: {login} vs {}", user.login),
            ));
        }

        reporter.note(format!(
            "Inviting `{login}` to `{org_name}` as a direct member"
        ));
        if !ctx.dry_run {
            if let Err(err) = client.create_org_invitation(org_name, user.id).await {
                tracing::warn!(org = org_name, login = %login, error = %err, "org invitation failed");
                continue;
            }
        }
        pending.insert(login.clone());
    }

    Ok(pending)
}
