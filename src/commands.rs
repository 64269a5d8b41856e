//! CLI command handlers.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use quay_client::{ClientConfig, QuayClient, RobotAccount};
use quay_reconciler::{Reconciler, ReconcilerBuilder, Role};
use serde::Serialize;
use tracing::info;

use crate::cli::{Commands, RobotArgs};

/// Credential handed back to the caller.
#[derive(Debug, Serialize)]
struct Credential<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a RobotAccount> for Credential<'a> {
    fn from(account: &'a RobotAccount) -> Self {
        Self {
            username: &account.name,
            password: &account.token,
        }
    }
}

/// Execute a CLI command.
pub async fn execute_command(config: Option<&Path>, command: Commands) -> Result<()> {
    let reconciler = build_reconciler(config)?;

    match command {
        Commands::Create(args) => cmd_create(&reconciler, &args).await,
        Commands::Rotate(args) => cmd_rotate(&reconciler, &args).await,
        Commands::Delete(args) => cmd_delete(&reconciler, &args).await,
    }
}

fn build_reconciler(config: Option<&Path>) -> Result<Reconciler> {
    let config = match config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("Failed to load client config from {}", path.display()))?,
        None => {
            ClientConfig::from_env().context("Failed to load client config from environment")?
        }
    };

    info!(url = %config.url, "Using registry");
    let client = QuayClient::new(config).context("Failed to build registry client")?;
    ReconcilerBuilder::new()
        .with_client(Arc::new(client))
        .build()
        .context("Failed to build reconciler")
}

fn load_role(args: &RobotArgs) -> Result<Role> {
    Role::from_file(&args.role)
        .with_context(|| format!("Failed to load role from {}", args.role.display()))
}

async fn cmd_create(reconciler: &Reconciler, args: &RobotArgs) -> Result<()> {
    let role = load_role(args)?;
    let outcome = reconciler
        .reconcile(&args.name, &role)
        .await
        .with_context(|| format!("Failed to provision robot {}", args.name))?;

    for action in &outcome.actions_taken {
        info!(action = %action.description(), "Applied");
    }

    print_credential(&outcome.account)
}

async fn cmd_rotate(reconciler: &Reconciler, args: &RobotArgs) -> Result<()> {
    let role = load_role(args)?;
    let account = reconciler
        .regenerate_robot_password(&args.name, &role)
        .await
        .with_context(|| format!("Failed to rotate robot {}", args.name))?;

    print_credential(&account)
}

async fn cmd_delete(reconciler: &Reconciler, args: &RobotArgs) -> Result<()> {
    let role = load_role(args)?;
    reconciler
        .delete_robot(&args.name, &role)
        .await
        .with_context(|| format!("Failed to delete robot {}", args.name))
}

fn print_credential(account: &RobotAccount) -> Result<()> {
    let json = serde_json::to_string_pretty(&Credential::from(account))
        .context("Failed to encode credential")?;
    println!("{json}");
    Ok(())
}
