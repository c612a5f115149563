//! Stockpile CLI - Command-line client for the Stockpile inventory API
//!
//! Talks to a running stockpile-api instance and keeps a local offline
//! queue for edits made without connectivity.

mod cli;
mod client;
mod commands;
mod error;

use clap::Parser;

use cli::{Cli, Commands, QueueCommands};
use commands::common::Context;
use commands::update::UpdateArgs;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stockpile=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let context = Context::resolve(cli.base_url, cli.token, cli.queue_path)?;

    match cli.command {
        Commands::Add {
            name,
            sku,
            quantity,
            price_cents,
        } => commands::add::run_add(&context, name, sku, quantity, price_cents).await?,
        Commands::List {
            limit,
            offset,
            json,
        } => commands::list::run_list(&context, limit, offset, json).await?,
        Commands::Get { id, json } => commands::get::run_get(&context, &id, json).await?,
        Commands::Update {
            id,
            version,
            name,
            sku,
            quantity,
            price_cents,
            on_conflict,
            on_permission,
            offline,
        } => {
            commands::update::run_update(
                &context,
                UpdateArgs {
                    id,
                    version,
                    name,
                    sku,
                    quantity,
                    price_cents,
                    on_conflict,
                    on_permission,
                    offline,
                },
            )
            .await?;
        }
        Commands::Delete {
            id,
            version,
            offline,
        } => commands::delete::run_delete(&context, &id, version, offline).await?,
        Commands::Queue { command } => match command {
            QueueCommands::Status { json } => {
                commands::queue::run_queue_status(&context, json)?;
            }
            QueueCommands::Sync => commands::queue::run_queue_sync(&context).await?,
            QueueCommands::Compact => commands::queue::run_queue_compact(&context)?,
        },
    }

    Ok(())
}
