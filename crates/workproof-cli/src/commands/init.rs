use anyhow::{Context, Result};
use std::path::Path;

use workproof_types::Signer;
use workproof_wallet::Wallet;

use crate::config::WorkproofConfig;
use crate::state::wallets_dir;

/// Handle the `init` command. Existing config and wallet are left untouched.
pub async fn handle(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let config_path = WorkproofConfig::config_path(data_dir);
    let config = if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        WorkproofConfig::load(data_dir)?
    } else {
        let config = WorkproofConfig::default();
        config.save(data_dir)?;
        println!("Created default config at: {}", config_path.display());
        config
    };

    let wallets = wallets_dir(data_dir);
    if Wallet::exists(&wallets, &config.wallet) {
        let wallet = Wallet::load(&wallets, &config.wallet)?;
        println!("Wallet '{}' already exists: {}", wallet.name(), wallet.address());
    } else {
        let wallet = Wallet::create(&config.wallet)?;
        let path = wallet.save(&wallets)?;
        println!("Created wallet '{}': {}", wallet.name(), wallet.address());
        println!("  saved to {}", path.display());
    }

    println!();
    println!("Data directory: {}", data_dir.display());
    Ok(())
}
