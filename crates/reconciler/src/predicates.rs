//! Checks deciding whether registry state already matches a role.

use quay_client::{Permission, Prototype, Repository, RepositoryPermission};

/// Whether a prototype already grants `role` to the robot `robot_account`.
pub fn prototype_grants_robot(
    prototypes: &[Prototype],
    robot_account: &str,
    role: Permission,
) -> bool {
    prototypes.iter().any(|prototype| {
        prototype.role == role
            && prototype.delegate.robot
            && prototype.delegate.name == robot_account
    })
}

/// Whether the robot already holds exactly `role` on `repository`.
///
/// A different role on the same repository, or no entry at all, means an
/// update is needed.
pub fn permission_up_to_date(
    repository: &str,
    role: Permission,
    permissions: &[RepositoryPermission],
) -> bool {
    permissions
        .iter()
        .any(|permission| permission.repository.name == repository && permission.role == role)
}

/// Whether a repository of that name is in the listing.
pub fn repository_exists(name: &str, repositories: &[Repository]) -> bool {
    repositories.iter().any(|repository| repository.name == name)
}
