//! In-memory registry used to drive the reconciler without a network.
//!
//! State persists across calls, so a second pass observes what the first
//! one wrote. Every call is journaled and any operation can be made to
//! answer with a chosen failure status.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use itertools::Itertools;
use quay_client::{
    ApiResponse, NamespaceType, Permission, Prototype, PrototypeDelegate, RegistryApi, Repository,
    RepositoryPermission, RobotAccount, Team, TeamRole,
};
use tokio::sync::Mutex;

/// Registry operations, as recorded in the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    GetRobotAccount,
    CreateRobotAccount,
    DeleteRobotAccount,
    RegenerateRobotPassword,
    CreateTeam,
    AddTeamMember,
    GetPrototypes,
    CreatePrototype,
    GetRobotPermissions,
    GetRepositories,
    UpdateRepositoryPermission,
}

impl Operation {
    /// Whether the operation writes to the registry.
    pub const fn is_mutation(self) -> bool {
        !matches!(
            self,
            Self::GetRobotAccount
                | Self::GetPrototypes
                | Self::GetRobotPermissions
                | Self::GetRepositories
        )
    }
}

/// One journaled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: Operation,
    /// Human-readable target, e.g. `acme/devs`.
    pub target: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Keyed by (namespace, short robot name).
    robots: BTreeMap<(String, String), RobotAccount>,
    /// Keyed by (organization, team).
    teams: BTreeMap<(String, String), TeamRole>,
    /// (organization, team, member).
    members: BTreeSet<(String, String, String)>,
    prototypes: BTreeMap<String, Vec<Prototype>>,
    repositories: BTreeMap<String, Vec<Repository>>,
    /// Keyed by (namespace, repository, short robot name).
    permissions: BTreeMap<(String, String, String), Permission>,
    failures: BTreeMap<Operation, u16>,
    calls: Vec<RecordedCall>,
    serial: u64,
}

impl RegistryState {
    fn next_serial(&mut self) -> u64 {
        self.serial = self.serial.saturating_add(1);
        self.serial
    }

    fn issue_token(&mut self) -> String {
        format!("token-{}", self.next_serial())
    }

    /// Journal the call and return the injected failure, if any.
    fn record<T>(&mut self, operation: Operation, target: String) -> Option<ApiResponse<T>> {
        self.calls.push(RecordedCall { operation, target });
        self.failures
            .get(&operation)
            .map(|status| ApiResponse::failure(*status, format!("injected {operation:?} failure")))
    }
}

/// A [`RegistryApi`] backed by in-process state.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing robot account.
    #[must_use]
    pub fn with_robot(
        mut self,
        namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> Self {
        let state = self.state.get_mut();
        let token = state.issue_token();
        let account = RobotAccount {
            name: qualified_name(namespace, robot),
            description: format!("seeded {namespace_type} robot"),
            token,
            ..Default::default()
        };
        state
            .robots
            .insert((namespace.to_string(), robot.to_string()), account);
        self
    }

    /// Seed a repository in a namespace.
    #[must_use]
    pub fn with_repository(mut self, namespace: &str, name: &str) -> Self {
        self.state
            .get_mut()
            .repositories
            .entry(namespace.to_string())
            .or_default()
            .push(Repository::new(namespace, name));
        self
    }

    /// Seed a prototype granting `role` to a robot.
    #[must_use]
    pub fn with_robot_prototype(
        mut self,
        organization: &str,
        robot_account: &str,
        role: Permission,
    ) -> Self {
        let state = self.state.get_mut();
        let prototype = new_robot_prototype(state.next_serial(), robot_account, role);
        state
            .prototypes
            .entry(organization.to_string())
            .or_default()
            .push(prototype);
        self
    }

    /// Seed a permission a robot holds on a repository.
    #[must_use]
    pub fn with_permission(
        mut self,
        namespace: &str,
        repository: &str,
        robot: &str,
        role: Permission,
    ) -> Self {
        self.state.get_mut().permissions.insert(
            (namespace.to_string(), repository.to_string(), robot.to_string()),
            role,
        );
        self
    }

    /// Make every call of `operation` answer with `status`.
    #[must_use]
    pub fn fail_operation(mut self, operation: Operation, status: u16) -> Self {
        self.state.get_mut().failures.insert(operation, status);
        self
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Number of calls of one operation.
    pub async fn call_count(&self, operation: Operation) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Number of write calls made so far.
    pub async fn mutation_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.operation.is_mutation())
            .count()
    }

    /// Forget the journal, keeping registry state.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Look a robot up by its short name.
    pub async fn robot(&self, namespace: &str, robot: &str) -> Option<RobotAccount> {
        self.state
            .lock()
            .await
            .robots
            .get(&(namespace.to_string(), robot.to_string()))
            .cloned()
    }

    /// Teams of an organization.
    pub async fn teams(&self, organization: &str) -> Vec<Team> {
        self.state
            .lock()
            .await
            .teams
            .iter()
            .filter(|((org, _), _)| org == organization)
            .map(|((_, name), role)| Team::new(name.clone(), *role))
            .collect_vec()
    }

    /// Members of a team.
    pub async fn members(&self, organization: &str, team: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .members
            .iter()
            .filter(|(org, name, _)| org == organization && name == team)
            .map(|(_, _, member)| member.clone())
            .collect_vec()
    }

    /// Prototypes of an organization.
    pub async fn prototypes(&self, organization: &str) -> Vec<Prototype> {
        self.state
            .lock()
            .await
            .prototypes
            .get(organization)
            .cloned()
            .unwrap_or_default()
    }

    /// Permission a robot holds on a repository.
    pub async fn permission(
        &self,
        namespace: &str,
        repository: &str,
        robot: &str,
    ) -> Option<Permission> {
        self.state
            .lock()
            .await
            .permissions
            .get(&(namespace.to_string(), repository.to_string(), robot.to_string()))
            .copied()
    }
}

fn qualified_name(namespace: &str, robot: &str) -> String {
    format!("{namespace}+{robot}")
}

fn new_robot_prototype(serial: u64, robot_account: &str, role: Permission) -> Prototype {
    Prototype {
        id: format!("prototype-{serial}"),
        role,
        delegate: PrototypeDelegate {
            kind: "user".to_string(),
            name: robot_account.to_string(),
            robot: robot_account.contains('+'),
            org_member: true,
        },
    }
}

fn robot_missing<T>(namespace: &str, robot: &str) -> ApiResponse<T> {
    ApiResponse::failure(
        400,
        format!(
            "Could not find robot with specified username {}",
            qualified_name(namespace, robot)
        ),
    )
}

#[async_trait]
impl RegistryApi for InMemoryRegistry {
    async fn get_robot_account(
        &self,
        _namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> quay_client::Result<ApiResponse<RobotAccount>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::GetRobotAccount, qualified_name(namespace, robot))
        {
            return Ok(failure);
        }

        Ok(state
            .robots
            .get(&(namespace.to_string(), robot.to_string()))
            .cloned()
            .map_or_else(|| robot_missing(namespace, robot), |a| ApiResponse::success(200, a)))
    }

    async fn create_robot_account(
        &self,
        _namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> quay_client::Result<ApiResponse<RobotAccount>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::CreateRobotAccount, qualified_name(namespace, robot))
        {
            return Ok(failure);
        }

        let account = RobotAccount {
            name: qualified_name(namespace, robot),
            token: state.issue_token(),
            ..Default::default()
        };
        state
            .robots
            .insert((namespace.to_string(), robot.to_string()), account.clone());
        Ok(ApiResponse::success(201, account))
    }

    async fn delete_robot_account(
        &self,
        _namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> quay_client::Result<ApiResponse<()>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::DeleteRobotAccount, qualified_name(namespace, robot))
        {
            return Ok(failure);
        }

        let key = (namespace.to_string(), robot.to_string());
        if state.robots.remove(&key).is_none() {
            return Ok(robot_missing(namespace, robot));
        }
        state
            .permissions
            .retain(|(ns, _, holder), _| !(ns == namespace && holder == robot));
        Ok(ApiResponse::success(204, ()))
    }

    async fn regenerate_robot_account_password(
        &self,
        _namespace_type: NamespaceType,
        namespace: &str,
        robot: &str,
    ) -> quay_client::Result<ApiResponse<RobotAccount>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::RegenerateRobotPassword, qualified_name(namespace, robot))
        {
            return Ok(failure);
        }

        let token = state.issue_token();
        let key = (namespace.to_string(), robot.to_string());
        Ok(match state.robots.get_mut(&key) {
            Some(account) => {
                account.token = token;
                ApiResponse::success(200, account.clone())
            }
            None => robot_missing(namespace, robot),
        })
    }

    async fn create_team(
        &self,
        organization: &str,
        team: &Team,
    ) -> quay_client::Result<ApiResponse<Team>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::CreateTeam, format!("{organization}/{}", team.name))
        {
            return Ok(failure);
        }

        state
            .teams
            .insert((organization.to_string(), team.name.clone()), team.role);
        Ok(ApiResponse::success(200, team.clone()))
    }

    async fn add_team_member(
        &self,
        organization: &str,
        team: &str,
        member: &str,
    ) -> quay_client::Result<ApiResponse<()>> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.record(
            Operation::AddTeamMember,
            format!("{organization}/{team}/{member}"),
        ) {
            return Ok(failure);
        }

        if !state
            .teams
            .contains_key(&(organization.to_string(), team.to_string()))
        {
            return Ok(ApiResponse::failure(404, format!("Unknown team {team}")));
        }
        state
            .members
            .insert((organization.to_string(), team.to_string(), member.to_string()));
        Ok(ApiResponse::success(200, ()))
    }

    async fn get_prototypes_by_organization(
        &self,
        organization: &str,
    ) -> quay_client::Result<ApiResponse<Vec<Prototype>>> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.record(Operation::GetPrototypes, organization.to_string()) {
            return Ok(failure);
        }

        let prototypes = state
            .prototypes
            .get(organization)
            .cloned()
            .unwrap_or_default();
        Ok(ApiResponse::success(200, prototypes))
    }

    async fn create_robot_permission_for_organization(
        &self,
        organization: &str,
        robot_account: &str,
        role: Permission,
    ) -> quay_client::Result<ApiResponse<Prototype>> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.record(
            Operation::CreatePrototype,
            format!("{organization}/{robot_account}"),
        ) {
            return Ok(failure);
        }

        let prototype = new_robot_prototype(state.next_serial(), robot_account, role);
        state
            .prototypes
            .entry(organization.to_string())
            .or_default()
            .push(prototype.clone());
        Ok(ApiResponse::success(200, prototype))
    }

    async fn get_robot_permissions(
        &self,
        organization: &str,
        robot: &str,
    ) -> quay_client::Result<ApiResponse<Vec<RepositoryPermission>>> {
        let mut state = self.state.lock().await;
        if let Some(failure) =
            state.record(Operation::GetRobotPermissions, qualified_name(organization, robot))
        {
            return Ok(failure);
        }

        let permissions = state
            .permissions
            .iter()
            .filter(|((ns, _, holder), _)| ns == organization && holder == robot)
            .map(|((_, repository, _), role)| RepositoryPermission::new(repository.clone(), *role))
            .collect_vec();
        Ok(ApiResponse::success(200, permissions))
    }

    async fn get_repositories_for_namespace(
        &self,
        namespace: &str,
    ) -> quay_client::Result<ApiResponse<Vec<Repository>>> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.record(Operation::GetRepositories, namespace.to_string()) {
            return Ok(failure);
        }

        let repositories = state
            .repositories
            .get(namespace)
            .cloned()
            .unwrap_or_default();
        Ok(ApiResponse::success(200, repositories))
    }

    async fn update_repository_user_permission(
        &self,
        namespace: &str,
        repository: &str,
        robot: &str,
        role: Permission,
    ) -> quay_client::Result<ApiResponse<RepositoryPermission>> {
        let mut state = self.state.lock().await;
        if let Some(failure) = state.record(
            Operation::UpdateRepositoryPermission,
            format!("{namespace}/{repository}/{robot}"),
        ) {
            return Ok(failure);
        }

        let exists = state
            .repositories
            .get(namespace)
            .is_some_and(|repositories| repositories.iter().any(|r| r.name == repository));
        if !exists {
            return Ok(ApiResponse::failure(
                400,
                format!("Unknown repository {namespace}/{repository}"),
            ));
        }

        state.permissions.insert(
            (namespace.to_string(), repository.to_string(), robot.to_string()),
            role,
        );
        Ok(ApiResponse::success(200, RepositoryPermission::new(repository, role)))
    }
}
