mod commands;
mod config;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkproofConfig;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "workproof", about = "Proof-of-work ledger for AI agent output", version)]
pub struct Cli {
    /// Data directory (default: ~/.workproof)
    #[arg(long, global = true, env = "WORKPROOF_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, default config and wallet
    Init,
    /// Wallet management
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Seal blocks to the configured wallet
    Mine {
        /// Number of blocks to seal
        #[arg(long, default_value_t = 1)]
        blocks: u64,
    },
    /// Show the mining balance of an address
    Balance {
        /// Address (default: configured wallet)
        #[arg(long)]
        address: Option<String>,
    },
    /// Inspect the block chain
    Chain {
        #[command(subcommand)]
        action: ChainAction,
    },
    /// Show work and mining statistics
    Status,
    /// Print an attestation over recent proof hashes
    Proof {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Run the HTTP API and the mining loop
    Serve {
        /// Start mining immediately
        #[arg(long)]
        mine: bool,
        /// Listen address (default: from config)
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
}

#[derive(Subcommand)]
pub enum WalletAction {
    /// Create a new wallet
    Create {
        /// Wallet name
        name: String,
    },
    /// List all wallets
    List,
    /// Show a wallet's address and public key
    Show {
        /// Wallet name (default: configured wallet)
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ChainAction {
    /// Print the most recent blocks
    Show {
        #[arg(long, default_value_t = 10)]
        last: usize,
    },
    /// Verify hashes, links and difficulty of the whole chain
    Verify,
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let data_dir = cli
        .data_dir
        .unwrap_or_else(WorkproofConfig::default_data_dir);

    match cli.command {
        Commands::Init => commands::init::handle(&data_dir).await,
        Commands::Wallet { action } => commands::wallet::handle(action, &data_dir).await,
        Commands::Mine { blocks } => {
            commands::chain::mine(&AppState::open(&data_dir).await?, blocks).await
        }
        Commands::Balance { address } => {
            commands::chain::balance(&AppState::open(&data_dir).await?, address).await
        }
        Commands::Chain { action } => {
            commands::chain::handle(action, &AppState::open(&data_dir).await?).await
        }
        Commands::Status => commands::status::handle(&AppState::open(&data_dir).await?).await,
        Commands::Proof { limit } => {
            commands::status::proof(&AppState::open(&data_dir).await?, limit).await
        }
        Commands::Serve { mine, listen } => {
            commands::serve::handle(&AppState::open(&data_dir).await?, mine, listen).await
        }
    }
}
