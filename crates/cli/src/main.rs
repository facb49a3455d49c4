//! Emporium CLI - admin user management, catalog seeding and housekeeping.
//!
//! # Usage
//!
//! ```bash
//! # Create an admin and print their admin key (shown once)
//! emp-cli admin create -e admin@example.com
//!
//! # Replace a lost or leaked key
//! emp-cli admin rotate-key -e admin@example.com
//!
//! # Lock an admin out / let them back in
//! emp-cli admin deactivate -e admin@example.com
//! emp-cli admin activate -e admin@example.com
//!
//! # Upsert categories and products from YAML
//! emp-cli seed catalog catalog.yaml
//!
//! # Delete one-time codes that have been dead for a day
//! emp-cli otp purge
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "emp-cli")]
#[command(author, version, about = "Emporium CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// One-time code housekeeping
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user and print their admin key
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// Issue a new admin key, invalidating the old one
    RotateKey {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// Block an admin from logging in
    Deactivate {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// Allow a deactivated admin to log in again
    Activate {
        /// Admin email address
        #[arg(short, long)]
        email: String,
    },
    /// List admin users
    List,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert categories and products by slug
    Catalog {
        /// Path to the YAML catalog file
        file: String,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Delete used or expired codes older than the cutoff
    Purge {
        /// Age in hours after which dead codes are deleted
        #[arg(long, default_value_t = 24)]
        older_than_hours: u32,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Create { email } => commands::admin::create(&email).await?,
            AdminAction::RotateKey { email } => commands::admin::rotate_key(&email).await?,
            AdminAction::Deactivate { email } => {
                commands::admin::set_active(&email, false).await?;
            }
            AdminAction::Activate { email } => commands::admin::set_active(&email, true).await?,
            AdminAction::List => commands::admin::list().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Catalog { file } => commands::seed::catalog(&file).await?,
        },
        Commands::Otp { action } => match action {
            OtpAction::Purge { older_than_hours } => {
                commands::otp::purge(older_than_hours).await?;
            }
        },
    }
    Ok(())
}
