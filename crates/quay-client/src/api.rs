//! The registry operations consumed by the reconciler.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{
    ApiResponse, NamespaceType, Permission, Prototype, Repository, RepositoryPermission,
    RobotAccount, Team,
};

/// Typed access to the robot, team, prototype and repository endpoints of a
/// registry.
///
/// `Err` is reserved for transport and decoding failures. A request that got
/// an answer comes back as `Ok(ApiResponse)` whatever its status, and the
/// caller decides what that status means.
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// Fetch a robot account. A 400 status means the robot does not exist.
    async fn get_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>>;

    /// Create a robot account, returning it with its token.
    async fn create_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>>;

    /// Delete a robot account.
    async fn delete_robot_account(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<()>>;

    /// Issue a new token for a robot account.
    async fn regenerate_robot_account_password(
        &self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Result<ApiResponse<RobotAccount>>;

    /// Create or update a team in an organization.
    async fn create_team(&self, organization: &str, team: &Team) -> Result<ApiResponse<Team>>;

    /// Add a member (user or robot) to a team.
    async fn add_team_member(
        &self,
        organization: &str,
        team: &str,
        member: &str,
    ) -> Result<ApiResponse<()>>;

    /// List the default permission prototypes of an organization.
    async fn get_prototypes_by_organization(
        &self,
        organization: &str,
    ) -> Result<ApiResponse<Vec<Prototype>>>;

    /// Create a prototype granting `role` to the robot `robot_account`.
    async fn create_robot_permission_for_organization(
        &self,
        organization: &str,
        robot_account: &str,
        role: Permission,
    ) -> Result<ApiResponse<Prototype>>;

    /// List the repository permissions a robot currently holds.
    async fn get_robot_permissions(
        &self,
        organization: &str,
        robot: &str,
    ) -> Result<ApiResponse<Vec<RepositoryPermission>>>;

    /// List the repositories of a namespace.
    async fn get_repositories_for_namespace(
        &self,
        namespace: &str,
    ) -> Result<ApiResponse<Vec<Repository>>>;

    /// Set the permission a robot holds on a repository.
    async fn update_repository_user_permission(
        &self,
        namespace: &str,
        repository: &str,
        robot: &str,
        role: Permission,
    ) -> Result<ApiResponse<RepositoryPermission>>;
}
