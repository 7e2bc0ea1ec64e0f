//! zuschat cli definition and entrypoint.
mod ask;
mod chat;
mod history;
pub mod ux;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use zuschat_core::api::ApiClient;
use zuschat_core::config::get_config;
use zuschat_core::storage::{ChatStorage, FileStore};

use crate::log::setup_logging;

const INPUT_HISTORY_FILE: &str = "history.txt";

/// zuschat - chat with the ZUS Coffee drinkware and outlet assistant.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Start an interactive chat session.
    Chat,
    /// Ask a single question and print the answer.
    Ask {
        /// Question to ask.
        question: Vec<String>,
    },
    /// Check whether the backend is reachable.
    Health,
    /// Show product and outlet statistics.
    Stats,
    /// Show or manage the saved chat history.
    History {
        /// Render messages the way the web client displays them.
        #[arg(long)]
        html: bool,
        /// Show storage diagnostics instead of messages.
        #[arg(long)]
        info: bool,
        /// Delete the saved history.
        #[arg(long)]
        clear: bool,
    },
}

/// Runs the main CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        setup_logging().context("Failed to set up logging")?;
    }

    let config = get_config(cli.config).context("Failed to load configuration")?;
    debug!("Using backend at {}", config.api_url);

    let api = ApiClient::from_config(&config).context("Failed to create backend client")?;
    let store = FileStore::from_config(&config.storage)
        .context("Failed to open chat history storage")?;
    let input_history = store.dir().join(INPUT_HISTORY_FILE);
    let storage = ChatStorage::new(store);

    match cli.command {
        Commands::Chat => chat::execute(api, storage, Some(input_history)).await,
        Commands::Ask { question } => ask::execute(&api, question).await,
        Commands::Health => ask::health(&api).await,
        Commands::Stats => ask::stats(&api).await,
        Commands::History { html, info, clear } => {
            history::execute(&storage, html, info, clear)
        }
    }
}
