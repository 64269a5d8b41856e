//! Team assembly for organization roles.

use std::collections::BTreeMap;

use quay_client::{Team, TeamRole};

use crate::types::Role;

/// Prefix of teams synthesized by the reconciler.
pub const TEAM_PREFIX: &str = "vault";

/// Name of the team granting repository creation, `vault-creator`.
pub fn creator_team_name() -> String {
    format!("{TEAM_PREFIX}-{}", TeamRole::Creator)
}

/// Build every team a role implies, keyed by team name.
///
/// Declared teams come first; when the role allows repository creation the
/// creator team is added on top, replacing any declared team of that name.
pub fn assemble_teams(role: &Role) -> BTreeMap<String, Team> {
    let mut teams: BTreeMap<String, Team> = role
        .teams
        .iter()
        .flatten()
        .map(|(name, team_role)| (name.clone(), Team::new(name.clone(), *team_role)))
        .collect();

    if role.create_repositories {
        let name = creator_team_name();
        teams.insert(name.clone(), Team::new(name, TeamRole::Creator));
    }

    teams
}
