//! Cartbridge CLI - Catalog and cart service tools.
//!
//! # Usage
//!
//! ```bash
//! # Validate a catalog file
//! cartbridge catalog validate crates/storefront/catalog.json
//!
//! # Show a customer's authenticated cart as JSON
//! cartbridge remote show --customer-id 42 --token "$TOKEN" --url https://carts.example.com/api/
//! ```
//!
//! # Commands
//!
//! - `catalog validate` - Parse and validate a catalog file
//! - `remote show` - Fetch an authenticated cart from the remote cart service

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use commands::CliError;

mod commands;

#[derive(Parser)]
#[command(name = "cartbridge")]
#[command(author, version, about = "Cartbridge CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Product catalog files
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
    /// Remote cart service
    Remote {
        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Parse and validate a catalog file
    Validate {
        /// Path to the catalog JSON file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum RemoteAction {
    /// Print a customer's authenticated cart as JSON
    Show {
        /// Customer ID
        #[arg(short, long)]
        customer_id: String,

        /// Customer access token
        #[arg(short, long)]
        token: String,

        /// Cart service base URL
        #[arg(short, long, env = "CART_SERVICE_URL")]
        url: Url,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Catalog { action } => match action {
            CatalogAction::Validate { path } => {
                let count = commands::catalog::validate(&path)?;
                println!("{}: {count} products", path.display());
            }
        },
        Commands::Remote { action } => match action {
            RemoteAction::Show {
                customer_id,
                token,
                url,
            } => match commands::remote::show(url, &customer_id, &token).await? {
                Some(cart) => println!("{}", serde_json::to_string_pretty(&cart)?),
                None => println!("null"),
            },
        },
    }
    Ok(())
}
