use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use workproof_ledger::{FileChainStore, Miner};
use workproof_tracker::{FileRecordStore, Tracker};
use workproof_wallet::Wallet;

use crate::config::WorkproofConfig;

/// Everything a command needs, opened from the data directory.
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: WorkproofConfig,
    pub wallet: Arc<Wallet>,
    pub tracker: Arc<Tracker>,
    pub miner: Arc<Miner>,
}

pub fn wallets_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("wallets")
}

impl AppState {
    /// Load config and wallet, then rebuild tracker and chain from disk.
    /// Any failure here is fatal to the command.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let config = WorkproofConfig::load(data_dir)?;

        let wallet = Wallet::load(&wallets_dir(data_dir), &config.wallet).with_context(|| {
            format!(
                "Failed to load wallet '{}' (run `workproof init` first)",
                config.wallet
            )
        })?;
        let wallet = Arc::new(wallet);

        let tracker = Tracker::open(
            config.value_model.clone(),
            Arc::new(FileRecordStore::new(data_dir)),
        )
        .await
        .context("Failed to open work record store")?
        .with_signer(wallet.clone());

        let miner = Miner::open(
            workproof_types::Signer::address(wallet.as_ref()),
            config.mining.miner_config(),
            Arc::new(FileChainStore::new(data_dir)),
        )
        .await
        .context("Failed to load chain")?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            wallet,
            tracker: Arc::new(tracker),
            miner: Arc::new(miner),
        })
    }
}
