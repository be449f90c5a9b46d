//! Pollchat CLI - inspect and maintain conversations from the terminal
//!
//! Operates on two SQLite files standing in for the local cache and the
//! remote store.

mod cli;
mod commands;
mod config;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::delete::run_delete;
use crate::commands::favorite::{run_normalize, run_reorder, run_set_favorite};
use crate::commands::list::{run_list, sort_options};
use crate::commands::related::run_related;
use crate::commands::validate::run_validate;
use crate::config::{load_settings, Overrides};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        "pollchat=info"
            .parse()
            .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?,
    );
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let settings = load_settings(Overrides {
        owner: cli.owner,
        local_db: cli.local_db,
        remote_db: cli.remote_db,
    })?;

    match cli.command {
        Commands::List {
            criteria,
            order,
            no_favorite_first,
            json,
        } => {
            let options = sort_options(
                settings.sort,
                criteria.map(Into::into),
                order.map(Into::into),
                no_favorite_first,
            );
            run_list(&settings, &options, json).await?;
        }
        Commands::Favorite { id } => run_set_favorite(&settings, &id, true).await?,
        Commands::Unfavorite { id } => run_set_favorite(&settings, &id, false).await?,
        Commands::Reorder { id, rank } => run_reorder(&settings, &id, rank).await?,
        Commands::Normalize => run_normalize(&settings).await?,
        Commands::Validate { json } => run_validate(&settings, json).await?,
        Commands::Delete { id, dry_run } => run_delete(&settings, &id, dry_run).await?,
        Commands::Related { id } => run_related(&settings, &id).await?,
    }

    Ok(())
}
