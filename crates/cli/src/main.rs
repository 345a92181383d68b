//! linkbio CLI - Database migrations and identity user management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! linkbio-cli migrate
//!
//! # Create the admin user (password from LINKBIO_USER_PASSWORD or --password)
//! LINKBIO_USER_PASSWORD=... linkbio-cli user create -e admin@example.com
//!
//! # Delete a user and revoke its credentials
//! linkbio-cli user delete -e admin@example.com
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` / `user delete` - Manage identity users

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "linkbio-cli")]
#[command(author, version, about = "linkbio CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage identity users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a user who can sign in to the admin editor
    Create {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// User password
        #[arg(long, env = "LINKBIO_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Delete a user and every credential issued to it
    Delete {
        /// User email address
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, password } => {
                commands::user::create(&email, &SecretString::from(password)).await?;
            }
            UserAction::Delete { email } => commands::user::delete(&email).await?,
        },
    }
    Ok(())
}
