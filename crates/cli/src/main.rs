//! Duct Order CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run migrations (backs up users first)
//! duct-cli migrate --backup-dir backups
//!
//! # List users
//! duct-cli user list
//!
//! # Promote a user to admin
//! duct-cli user set-role -e admin@example.com -r admin
//!
//! # Export and import users
//! duct-cli backup export -o users-backup.json
//! duct-cli backup import -i users-backup.json
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations with a user-count check
//! - `user` - List users and change roles
//! - `backup` - Export and import users as JSON

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "duct-cli")]
#[command(author, version, about = "Duct Order CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Directory for the pre-migration user backup
        #[arg(long, default_value = "backups")]
        backup_dir: PathBuf,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Export or import users
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// List all users
    List,
    /// Change a user's role
    SetRole {
        /// User email address
        #[arg(short, long)]
        email: String,

        /// New role (`admin`, `user`)
        #[arg(short, long)]
        role: String,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Write all users to a JSON file
    Export {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load users from a JSON file, skipping existing ones
    Import {
        /// Input file (backup document or legacy users.json)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate { backup_dir } => commands::migrate::run(&backup_dir).await,
        Commands::User { action } => match action {
            UserAction::List => commands::user::list().await,
            UserAction::SetRole { email, role } => commands::user::set_role(&email, &role).await,
        },
        Commands::Backup { action } => match action {
            BackupAction::Export { output } => commands::backup::export(&output).await,
            BackupAction::Import { input } => commands::backup::import(&input).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_set_role_parses_short_flags() {
        let cli = Cli::try_parse_from(["duct-cli", "user", "set-role", "-e", "a@b.co", "-r", "admin"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::User {
                action: UserAction::SetRole { .. }
            }
        ));
    }
}
