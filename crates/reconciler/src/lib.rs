//! Reconciliation of Quay robot accounts against a declarative role.
//!
//! This crate converges a registry to a [`Role`]:
//!
//! - **Desired State**: the role, naming a namespace plus the teams, default
//!   permission and repository permissions a robot should hold
//! - **Actual State**: read back from the registry on every pass
//! - **Diff**: predicates decide which grants are already in place
//! - **Actions**: only the missing grants are issued
//!
//! # Reconciliation
//!
//! A pass runs four ordered steps, each aborting on the first failure:
//!
//! 1. Ensure the robot account exists (a 400 lookup means "create it")
//! 2. Organizations only: upsert every team and add the robot to it
//! 3. Organizations only: attach a default permission prototype
//! 4. Grant each repository its resolved permission
//!
//! Passes are not transactional but are re-entrant, so a failed pass is
//! finished by running it again.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quay_client::{ClientConfig, Permission, QuayClient, TeamRole};
//! use quay_reconciler::{Reconciler, Role};
//!
//! let client = Arc::new(QuayClient::new(ClientConfig::from_env()?)?);
//! let reconciler = Reconciler::new(client);
//!
//! let role = Role::organization("acme")
//!     .with_team("devs", TeamRole::Member)
//!     .with_default_permission(Permission::Write)
//!     .allow_repository_creation();
//!
//! let account = reconciler.create_robot("deployer", &role).await?;
//! println!("token: {}", account.token);
//! ```

#![forbid(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod memory;
pub mod predicates;
pub mod reconciler;
pub mod teams;
pub mod types;

// Re-export main types
pub use error::{Error, Result};
pub use memory::{InMemoryRegistry, Operation, RecordedCall};
pub use predicates::{permission_up_to_date, prototype_grants_robot, repository_exists};
pub use reconciler::{Reconciler, ReconcilerBuilder};
pub use teams::{TEAM_PREFIX, assemble_teams, creator_team_name};
pub use types::{ROBOT_NOT_FOUND_STATUS, ReconcileAction, ReconcileOutcome, RobotLookup, Role};
