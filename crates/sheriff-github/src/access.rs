//! Access-level vocabulary and its mapping onto GitHub's permission model.

use serde::{Deserialize, Serialize};

use crate::types::PermissionFlags;

/// The five access levels a team or collaborator can hold on a repository.
///
/// These are the names used in the permissions document; GitHub's REST
/// surface calls the same levels `pull`, `triage`, `push`, `maintain` and
/// `admin`. The two vocabularies map onto each other totally in both
/// directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Triage,
    Write,
    Maintain,
    Admin,
}

impl AccessLevel {
    /// The GitHub-native permission string for this level.
    #[must_use]
    pub fn to_github(self) -> &'static str {
        match self {
            Self::Read => "pull",
            Self::Triage => "triage",
            Self::Write => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }

    /// Parse a GitHub-native permission string.
    #[must_use]
    pub fn from_github(permission: &str) -> Option<Self> {
        match permission {
            "pull" | "read" => Some(Self::Read),
            "triage" => Some(Self::Triage),
            "push" | "write" => Some(Self::Write),
            "maintain" => Some(Self::Maintain),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Decode a permissions bitmap as returned on team and collaborator
    /// objects. The highest true flag wins, checked admin-first.
    #[must_use]
    pub fn from_flags(flags: &PermissionFlags) -> Option<Self> {
        if flags.admin {
            Some(Self::Admin)
        } else if flags.maintain {
            Some(Self::Maintain)
        } else if flags.push {
            Some(Self::Write)
        } else if flags.triage {
            Some(Self::Triage)
        } else if flags.pull {
            Some(Self::Read)
        } else {
            None
        }
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Triage => "triage",
            Self::Write => "write",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "triage" => Ok(Self::Triage),
            "write" => Ok(Self::Write),
            "maintain" => Ok(Self::Maintain),
            "admin" => Ok(Self::Admin),
            _ => Err(format!(
                "invalid access level: {s}. Expected: read, triage, write, maintain, admin"
            )),
        }
    }
}
