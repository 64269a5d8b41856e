//! Wire types for the Quay REST API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of namespace a robot account lives under.
///
/// The rendered form is used verbatim as a path segment, so it must stay
/// `organization` / `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceType {
    /// An organization. Supports teams and permission prototypes.
    #[default]
    Organization,
    /// A user namespace. Robot accounts only.
    User,
}

impl NamespaceType {
    /// Path segment for this namespace type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::User => "user",
        }
    }

    /// Whether teams and prototypes exist for this namespace type.
    pub const fn supports_teams(self) -> bool {
        matches!(self, Self::Organization)
    }
}

impl fmt::Display for NamespaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Pull access.
    Read,
    /// Pull and push access.
    Write,
    /// Full control of the repository.
    Admin,
}

impl Permission {
    /// Wire form of the permission.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a team inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Organization administrators.
    Admin,
    /// Members allowed to create repositories.
    Creator,
    /// Plain members.
    Member,
}

impl TeamRole {
    /// Wire form of the team role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Creator => "creator",
            Self::Member => "member",
        }
    }
}

impl fmt::Display for TeamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A robot account as returned by the registry.
///
/// `token` is only meaningful on the responses of the create and regenerate
/// calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotAccount {
    /// Fully qualified name, `<namespace>+<robot>`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub last_accessed: Option<String>,
    /// Secret credential.
    #[serde(default)]
    pub token: String,
}

/// An organization team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub role: TeamRole,
}

impl Team {
    /// Create a new team definition.
    pub fn new(name: impl Into<String>, role: TeamRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Delegate of a permission prototype.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrototypeDelegate {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "is_robot")]
    pub robot: bool,
    #[serde(default, rename = "is_org_member")]
    pub org_member: bool,
}

/// Organization-wide default permission rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prototype {
    #[serde(default)]
    pub id: String,
    pub role: Permission,
    pub delegate: PrototypeDelegate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct PrototypesResponse {
    #[serde(default)]
    pub prototypes: Vec<Prototype>,
}

/// Repository reference embedded in a robot permission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

/// A permission a robot currently holds on a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryPermission {
    pub repository: RepositoryRef,
    pub role: Permission,
}

impl RepositoryPermission {
    /// Create a permission entry for the named repository.
    pub fn new(repository: impl Into<String>, role: Permission) -> Self {
        Self {
            repository: RepositoryRef {
                name: repository.into(),
                is_public: false,
            },
            role,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RobotPermissionsResponse {
    #[serde(default)]
    pub permissions: Vec<RepositoryPermission>,
}

/// A repository inside a namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl Repository {
    /// Create a repository entry.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            description: None,
            is_public: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RepositoriesResponse {
    #[serde(default)]
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PrototypeRequest<'a> {
    pub role: Permission,
    pub delegate: DelegateRequest<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct DelegateRequest<'a> {
    pub kind: &'static str,
    pub name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct PermissionRequest {
    pub role: Permission,
}

/// Outcome of a request that reached the registry.
///
/// The body is decoded only for 2xx statuses; anything else keeps the raw
/// response text so callers can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    status: u16,
    body: Option<T>,
    raw: String,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying a decoded body.
    pub const fn success(status: u16, body: T) -> Self {
        Self {
            status,
            body: Some(body),
            raw: String::new(),
        }
    }

    /// A non-success response carrying the raw body text.
    pub fn failure(status: u16, raw: impl Into<String>) -> Self {
        Self {
            status,
            body: None,
            raw: raw.into(),
        }
    }

    /// HTTP status code.
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is 2xx.
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decoded body, present on success.
    pub const fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Consume the response, returning the decoded body if any.
    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// Raw response text of a non-success response.
    pub fn raw_body(&self) -> &str {
        &self.raw
    }

    /// Transform the decoded body.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            status: self.status,
            body: self.body.map(f),
            raw: self.raw,
        }
    }
}
