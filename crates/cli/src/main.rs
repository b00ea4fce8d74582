//! Carnicería CLI - database migrations and shop management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations (shop schema and session table)
//! carniceria migrate
//!
//! # Give a registered shopper access to the back office
//! carniceria admin grant --email owner@example.com
//!
//! # Take it away again
//! carniceria admin revoke --email owner@example.com
//!
//! # Load the demo catalog, delivery schedule and contact details
//! carniceria seed --file seed/demo.yaml
//! ```
//!
//! All commands read `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "carniceria")]
#[command(author, version, about = "Carnicería CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage back office access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Seed the database with demo data
    Seed {
        /// Path to the YAML seed file
        #[arg(short, long, default_value = "seed/demo.yaml")]
        file: String,

        /// Replace the delivery schedule and contact details even if already set
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to the profile registered with an email
    Grant {
        /// Email address the shopper signed up with
        #[arg(short, long)]
        email: String,
    },
    /// Revoke the admin role
    Revoke {
        /// Email address the shopper signed up with
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
        },
        Commands::Seed { file, force } => commands::seed::run(&file, force).await?,
    }
    Ok(())
}
