#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # quay-client
//!
//! Typed client for the parts of the Quay REST API that manage robot
//! accounts: robots, organization teams, default permission prototypes,
//! repository listings and per-repository user permissions.
//!
//! Every operation goes through the [`RegistryApi`] trait. Transport and
//! decoding failures are `Err`; any answered request is an [`ApiResponse`]
//! carrying its HTTP status, so callers can tell "the registry said no"
//! apart from "the registry could not be reached".
//!
//! ## Example
//!
//! ```ignore
//! use quay_client::{ClientConfig, NamespaceType, QuayClient, RegistryApi};
//!
//! let config = ClientConfig::new("https://quay.example.com".parse()?).token(token);
//! let client = QuayClient::new(config)?;
//!
//! let response = client
//!     .get_robot_account(NamespaceType::Organization, "acme", "deployer")
//!     .await?;
//! if response.status() == 400 {
//!     // robot does not exist yet
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use api::RegistryApi;
pub use client::QuayClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use types::{
    ApiResponse, NamespaceType, Permission, Prototype, PrototypeDelegate, Repository,
    RepositoryPermission, RepositoryRef, RobotAccount, Team, TeamRole,
};
