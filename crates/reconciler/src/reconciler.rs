//! Reconciler implementation.

use std::sync::Arc;

use quay_client::{Permission, RegistryApi, RobotAccount};
use tracing::{debug, info, warn};

use crate::error::{Error, Result, require_success};
use crate::predicates::{permission_up_to_date, prototype_grants_robot};
use crate::teams::assemble_teams;
use crate::types::{ReconcileAction, ReconcileOutcome, RobotLookup, Role};

/// Converges a robot account in the registry to a [`Role`].
///
/// A pass is a strict sequence of awaited registry calls: account, then
/// teams, then the default prototype, then repository permissions. The first
/// failure aborts the pass and leaves whatever was already applied in place.
/// Rerunning the pass picks up from there, since every create is preceded by
/// a read of current state.
///
/// Nothing here serializes passes for the same robot. Two concurrent passes
/// can both observe "absent" and both create; the second create then
/// surfaces as an ordinary error.
pub struct Reconciler {
    /// Registry client.
    client: Arc<dyn RegistryApi>,
}

impl Reconciler {
    /// Create a new reconciler.
    pub fn new(client: Arc<dyn RegistryApi>) -> Self {
        Self { client }
    }

    /// Ensure the robot exists and holds everything the role grants,
    /// returning the account.
    ///
    /// # Errors
    ///
    /// Returns the first transport error or non-success status encountered.
    pub async fn create_robot(&self, robot_name: &str, role: &Role) -> Result<RobotAccount> {
        self.reconcile(robot_name, role)
            .await
            .map(|outcome| outcome.account)
    }

    /// Run one reconciliation pass, reporting the mutations it issued.
    ///
    /// # Errors
    ///
    /// Returns the first transport error or non-success status encountered.
    pub async fn reconcile(&self, robot_name: &str, role: &Role) -> Result<ReconcileOutcome> {
        info!(
            robot = robot_name,
            namespace = %role.namespace_name,
            namespace_type = %role.namespace_type,
            "Starting reconciliation"
        );

        let mut actions = Vec::new();

        let result = self.run_pass(robot_name, role, &mut actions).await;

        match result {
            Ok(account) => {
                let outcome = ReconcileOutcome::new(account, actions);
                if outcome.converged() {
                    info!(robot = robot_name, "Robot already converged");
                } else {
                    info!(
                        robot = robot_name,
                        actions_taken = outcome.actions_taken.len(),
                        "Reconciliation complete"
                    );
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(
                    robot = robot_name,
                    applied = actions.len(),
                    error = %e,
                    "Reconciliation aborted"
                );
                Err(e)
            }
        }
    }

    async fn run_pass(
        &self,
        robot_name: &str,
        role: &Role,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<RobotAccount> {
        let account = self.ensure_account(robot_name, role, actions).await?;

        if role.namespace_type.supports_teams() {
            self.ensure_teams(&account.name, role, actions).await?;

            if let Some(permission) = role.default_permission {
                self.ensure_prototype(&account.name, role, permission, actions)
                    .await?;
            }
        }

        if role.manages_repositories() {
            self.ensure_repository_permissions(robot_name, role, actions)
                .await?;
        }

        Ok(account)
    }

    async fn ensure_account(
        &self,
        robot_name: &str,
        role: &Role,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<RobotAccount> {
        let response = self
            .client
            .get_robot_account(role.namespace_type, &role.namespace_name, robot_name)
            .await?;

        match RobotLookup::from_response(response)? {
            RobotLookup::Found(account) => {
                debug!(robot = %account.name, "Robot account exists");
                Ok(account)
            }
            RobotLookup::NotFound => {
                debug!(robot = robot_name, "Robot account missing, creating");
                let response = self
                    .client
                    .create_robot_account(role.namespace_type, &role.namespace_name, robot_name)
                    .await?;
                let account = require_success("create_robot_account", response)?;
                actions.push(ReconcileAction::CreateRobot {
                    robot: robot_name.to_string(),
                });
                Ok(account)
            }
        }
    }

    async fn ensure_teams(
        &self,
        robot_account: &str,
        role: &Role,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<()> {
        for team in assemble_teams(role).into_values() {
            let response = self.client.create_team(&role.namespace_name, &team).await?;
            require_success("create_team", response)?;
            debug!(team = %team.name, role = %team.role, "Team ensured");

            let team_name = team.name.clone();
            actions.push(ReconcileAction::EnsureTeam { team });

            let response = self
                .client
                .add_team_member(&role.namespace_name, &team_name, robot_account)
                .await?;
            require_success("add_team_member", response)?;

            actions.push(ReconcileAction::AddTeamMember {
                team: team_name,
                member: robot_account.to_string(),
            });
        }
        Ok(())
    }

    async fn ensure_prototype(
        &self,
        robot_account: &str,
        role: &Role,
        permission: Permission,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<()> {
        let response = self
            .client
            .get_prototypes_by_organization(&role.namespace_name)
            .await?;
        let prototypes = require_success("get_prototypes_by_organization", response)?;

        if prototype_grants_robot(&prototypes, robot_account, permission) {
            debug!(robot = robot_account, role = %permission, "Prototype already present");
            return Ok(());
        }

        let response = self
            .client
            .create_robot_permission_for_organization(
                &role.namespace_name,
                robot_account,
                permission,
            )
            .await?;
        require_success("create_robot_permission_for_organization", response)?;

        actions.push(ReconcileAction::CreatePrototype {
            robot_account: robot_account.to_string(),
            role: permission,
        });
        Ok(())
    }

    async fn ensure_repository_permissions(
        &self,
        robot_name: &str,
        role: &Role,
        actions: &mut Vec<ReconcileAction>,
    ) -> Result<()> {
        let response = self
            .client
            .get_robot_permissions(&role.namespace_name, robot_name)
            .await?;
        let current = require_success("get_robot_permissions", response)?;

        let response = self
            .client
            .get_repositories_for_namespace(&role.namespace_name)
            .await?;
        let repositories = require_success("get_repositories_for_namespace", response)?;

        for repository in &repositories {
            let Some(permission) = role.desired_permission(&repository.name) else {
                continue;
            };

            if permission_up_to_date(&repository.name, permission, &current) {
                debug!(repository = %repository.name, role = %permission, "Permission up to date");
                continue;
            }

            let response = self
                .client
                .update_repository_user_permission(
                    &role.namespace_name,
                    &repository.name,
                    robot_name,
                    permission,
                )
                .await?;
            require_success("update_repository_user_permission", response)?;

            actions.push(ReconcileAction::UpdateRepositoryPermission {
                repository: repository.name.clone(),
                robot: robot_name.to_string(),
                role: permission,
            });
        }
        Ok(())
    }

    /// Delete the robot account.
    ///
    /// No existence check is made. A non-success answer is logged and
    /// tolerated, so revoking an already removed robot succeeds.
    ///
    /// # Errors
    ///
    /// Returns transport and decoding errors.
    pub async fn delete_robot(&self, robot_name: &str, role: &Role) -> Result<()> {
        let response = self
            .client
            .delete_robot_account(role.namespace_type, &role.namespace_name, robot_name)
            .await?;

        if response.is_success() {
            info!(robot = robot_name, namespace = %role.namespace_name, "Robot deleted");
        } else {
            warn!(
                robot = robot_name,
                status = response.status(),
                body = response.raw_body(),
                "Robot deletion not acknowledged"
            );
        }
        Ok(())
    }

    /// Issue a new token for the robot, returning the refreshed account.
    ///
    /// # Errors
    ///
    /// Returns transport errors and any non-success status.
    pub async fn regenerate_robot_password(
        &self,
        robot_name: &str,
        role: &Role,
    ) -> Result<RobotAccount> {
        let response = self
            .client
            .regenerate_robot_account_password(
                role.namespace_type,
                &role.namespace_name,
                robot_name,
            )
            .await?;
        let account = require_success("regenerate_robot_account_password", response)?;
        info!(robot = %account.name, "Robot token regenerated");
        Ok(account)
    }
}

/// Builder for Reconciler.
pub struct ReconcilerBuilder {
    client: Option<Arc<dyn RegistryApi>>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Set the registry client.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn RegistryApi>) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns an error if no client was set.
    pub fn build(self) -> Result<Reconciler> {
        let client = self
            .client
            .ok_or_else(|| Error::invalid_config("Registry client is required"))?;

        Ok(Reconciler::new(client))
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
