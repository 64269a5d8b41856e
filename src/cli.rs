//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Quay robot account manager
#[derive(Parser, Debug)]
#[command(name = "quay-robot")]
#[command(version)]
#[command(about = "Issue, rotate and revoke Quay robot accounts from a declarative role")]
#[command(
    long_about = "Reconciles a Quay robot account against a role file: the account, its team memberships, its default permission prototype and its repository permissions. Registry settings come from --config or the QUAY_URL, QUAY_TOKEN and QUAY_TIMEOUT_SECS environment variables."
)]
pub struct Cli {
    /// Client configuration file (TOML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the robot if needed and converge its grants to the role
    Create(RobotArgs),

    /// Issue a new token for an existing robot
    Rotate(RobotArgs),

    /// Delete the robot
    Delete(RobotArgs),
}

/// Arguments shared by every robot command.
#[derive(Args, Debug, Clone)]
pub struct RobotArgs {
    /// Role file (TOML or JSON)
    #[arg(short, long)]
    pub role: PathBuf,

    /// Short robot name, without the namespace prefix
    pub name: String,
}
