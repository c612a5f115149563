use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "stockpile")]
#[command(about = "Manage store inventory from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the Stockpile API
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "STOCKPILE_API_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    pub base_url: String,

    /// API token identifying the actor
    #[arg(long, global = true, value_name = "TOKEN", env = "STOCKPILE_API_TOKEN")]
    pub token: Option<String>,

    /// Optional path to the offline edit queue file
    #[arg(long, global = true, value_name = "PATH")]
    pub queue_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new product
    #[command(alias = "new")]
    Add {
        /// Product name
        name: String,
        /// Stock keeping unit
        #[arg(long)]
        sku: Option<String>,
        /// Units on hand
        #[arg(short, long, default_value = "0")]
        quantity: i64,
        /// Price in cents
        #[arg(short, long, default_value = "0")]
        price_cents: i64,
    },
    /// List products
    List {
        /// Number of products to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Number of products to skip
        #[arg(long, default_value = "0")]
        offset: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a single product
    Get {
        /// Product ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update fields of an existing product
    Update {
        /// Product ID
        id: String,
        /// Base version of the record being edited (fetched when omitted)
        #[arg(long)]
        version: Option<i64>,
        /// New product name
        #[arg(long)]
        name: Option<String>,
        /// New stock keeping unit
        #[arg(long)]
        sku: Option<String>,
        /// New units on hand
        #[arg(short, long)]
        quantity: Option<i64>,
        /// New price in cents
        #[arg(short, long)]
        price_cents: Option<i64>,
        /// What to do when the record changed under us
        #[arg(long, value_enum, default_value_t = ConflictChoice::Fail)]
        on_conflict: ConflictChoice,
        /// What to do when a field change is rejected for this role
        #[arg(long, value_enum, default_value_t = PermissionChoice::Fail)]
        on_permission: PermissionChoice,
        /// Queue the edit instead of sending it now
        #[arg(long)]
        offline: bool,
    },
    /// Delete a product
    Delete {
        /// Product ID
        id: String,
        /// Base version of the record being deleted (fetched when omitted)
        #[arg(long)]
        version: Option<i64>,
        /// Queue the delete instead of sending it now
        #[arg(long)]
        offline: bool,
    },
    /// Inspect and drive the offline edit queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictChoice {
    /// Report the conflict and stop
    Fail,
    /// Resubmit this edit at the server's current version
    KeepMine,
    /// Discard this edit and show the server's record
    AcceptRemote,
    /// Resubmit with local values where given, server values elsewhere
    Merge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum PermissionChoice {
    /// Report the rejection and stop
    Fail,
    /// Drop the protected-field change and resubmit the rest
    Drop,
    /// Pin the protected field to the server's value and resubmit
    KeepServer,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// Show queued edits
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one delivery pass over the queue
    Sync,
    /// Drop synced entries from the queue file
    Compact,
}
