//! Vitalis CLI - database migrations and content tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (profiles, carts, sessions)
//! vitalis-cli migrate
//!
//! # Load the content directory and report what was found
//! vitalis-cli content check
//! vitalis-cli content check --dir crates/storefront/content
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vitalis-cli")]
#[command(author, version, about = "Vitalis CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Work with the catalog and article content
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },
}

#[derive(Subcommand)]
enum ContentAction {
    /// Load the content directory and report counts or errors
    Check {
        /// Content directory
        #[arg(short, long, default_value = "crates/storefront/content")]
        dir: PathBuf,
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
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Content { action } => match action {
            ContentAction::Check { dir } => {
                commands::content::check(&dir)?;
            }
        },
    }
    Ok(())
}
