//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::path::Path;

use itertools::Itertools;
use quay_client::{ApiResponse, NamespaceType, Permission, RobotAccount, Team, TeamRole};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Status the registry uses to say a robot account does not exist.
pub const ROBOT_NOT_FOUND_STATUS: u16 = 400;

/// Desired state for the robots issued under one role.
///
/// A role names the namespace robots live in and everything a robot should
/// be granted there. Teams and prototypes only apply to organizations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Kind of namespace.
    #[serde(default)]
    pub namespace_type: NamespaceType,
    /// Organization or user name.
    pub namespace_name: String,
    /// Teams the robot joins, by name.
    #[serde(default)]
    pub teams: Option<BTreeMap<String, TeamRole>>,
    /// Permission granted on every repository of the namespace.
    #[serde(default)]
    pub default_permission: Option<Permission>,
    /// Per-repository permissions; these win over the default.
    #[serde(default)]
    pub repositories: Option<BTreeMap<String, Permission>>,
    /// Whether the robot may create repositories.
    #[serde(default)]
    pub create_repositories: bool,
}

impl Role {
    /// Create a role for an organization namespace.
    pub fn organization(name: impl Into<String>) -> Self {
        Self {
            namespace_type: NamespaceType::Organization,
            namespace_name: name.into(),
            ..Default::default()
        }
    }

    /// Create a role for a user namespace.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            namespace_type: NamespaceType::User,
            namespace_name: name.into(),
            ..Default::default()
        }
    }

    /// Add a team membership.
    #[must_use]
    pub fn with_team(mut self, name: impl Into<String>, role: TeamRole) -> Self {
        self.teams
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), role);
        self
    }

    /// Set the default permission.
    #[must_use]
    pub const fn with_default_permission(mut self, permission: Permission) -> Self {
        self.default_permission = Some(permission);
        self
    }

    /// Add an explicit repository permission.
    #[must_use]
    pub fn with_repository(mut self, name: impl Into<String>, permission: Permission) -> Self {
        self.repositories
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), permission);
        self
    }

    /// Allow the robot to create repositories.
    #[must_use]
    pub const fn allow_repository_creation(mut self) -> Self {
        self.create_repositories = true;
        self
    }

    /// Whether repository permissions are managed at all.
    ///
    /// An explicitly declared but empty repository map still counts.
    pub const fn manages_repositories(&self) -> bool {
        self.default_permission.is_some() || self.repositories.is_some()
    }

    /// Permission the robot should hold on `repository`.
    ///
    /// An explicit repository entry overrides the default permission.
    pub fn desired_permission(&self, repository: &str) -> Option<Permission> {
        self.repositories
            .as_ref()
            .and_then(|repositories| repositories.get(repository).copied())
            .or(self.default_permission)
    }

    /// Load a role from a TOML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names no
    /// namespace.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let role: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| Error::invalid_role(e.to_string()))?
        } else {
            toml::from_str(&content).map_err(|e| Error::invalid_role(e.to_string()))?
        };

        if role.namespace_name.trim().is_empty() {
            return Err(Error::invalid_role("namespace_name must not be empty"));
        }

        Ok(role)
    }
}

/// Result of looking a robot account up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotLookup {
    /// The robot exists.
    Found(RobotAccount),
    /// The registry reported the robot as absent.
    NotFound,
}

impl RobotLookup {
    /// Interpret a `get_robot_account` response.
    ///
    /// Quay answers 400, not 404, for a missing robot. Any other non-success
    /// status is a failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedStatus`] for statuses other than 2xx and 400.
    pub fn from_response(response: ApiResponse<RobotAccount>) -> Result<Self> {
        if response.status() == ROBOT_NOT_FOUND_STATUS {
            return Ok(Self::NotFound);
        }
        crate::error::require_success("get_robot_account", response).map(Self::Found)
    }
}

/// Mutations the reconciler can issue against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Create a robot account.
    CreateRobot { robot: String },
    /// Create or update a team.
    EnsureTeam { team: Team },
    /// Add a member to a team.
    AddTeamMember { team: String, member: String },
    /// Create a default permission prototype for a robot.
    CreatePrototype { robot_account: String, role: Permission },
    /// Set a robot's permission on a repository.
    UpdateRepositoryPermission {
        repository: String,
        robot: String,
        role: Permission,
    },
}

impl ReconcileAction {
    /// Whether re-issuing this action against a converged registry changes
    /// nothing. Team upserts and membership adds are sent on every pass.
    pub const fn is_idempotent_upsert(&self) -> bool {
        matches!(self, Self::EnsureTeam { .. } | Self::AddTeamMember { .. })
    }

    /// Get a description of the action.
    pub fn description(&self) -> String {
        match self {
            Self::CreateRobot { robot } => format!("create robot {robot}"),
            Self::EnsureTeam { team } => format!("ensure team {} ({})", team.name, team.role),
            Self::AddTeamMember { team, member } => format!("add {member} to team {team}"),
            Self::CreatePrototype {
                robot_account,
                role,
            } => format!("create {role} prototype for {robot_account}"),
            Self::UpdateRepositoryPermission {
                repository,
                robot,
                role,
            } => format!("grant {role} on {repository} to {robot}"),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The robot account, with its token when it was created in this pass.
    pub account: RobotAccount,
    /// Mutations issued, in order.
    pub actions_taken: Vec<ReconcileAction>,
}

impl ReconcileOutcome {
    /// Create a new outcome.
    pub const fn new(account: RobotAccount, actions_taken: Vec<ReconcileAction>) -> Self {
        Self {
            account,
            actions_taken,
        }
    }

    /// Whether the registry already matched the role before this pass.
    pub fn converged(&self) -> bool {
        self.actions_taken
            .iter()
            .all(ReconcileAction::is_idempotent_upsert)
    }

    /// Actions that changed registry state.
    pub fn state_changes(&self) -> Vec<&ReconcileAction> {
        self.actions_taken
            .iter()
            .filter(|a| !a.is_idempotent_upsert())
            .collect_vec()
    }
}
