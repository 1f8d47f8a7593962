use anyhow::{Result, bail};
use std::path::Path;

use workproof_types::Signer;
use workproof_wallet::Wallet;

use crate::WalletAction;
use crate::config::WorkproofConfig;
use crate::state::wallets_dir;

pub async fn handle(action: WalletAction, data_dir: &Path) -> Result<()> {
    let dir = wallets_dir(data_dir);

    match action {
        WalletAction::Create { name } => {
            if Wallet::exists(&dir, &name) {
                bail!("Wallet '{name}' already exists");
            }
            let wallet = Wallet::create(&name)?;
            let path = wallet.save(&dir)?;
            println!("Created wallet '{}': {}", wallet.name(), wallet.address());
            println!("  saved to {}", path.display());
        }

        WalletAction::List => {
            let configured = WorkproofConfig::load(data_dir)?.wallet;
            let wallets = Wallet::list(&dir)?;
            if wallets.is_empty() {
                println!("No wallets. Run `workproof init` to create one.");
                return Ok(());
            }
            for w in wallets {
                let marker = if w.name() == configured { "*" } else { " " };
                println!("{} {:<16} {}", marker, w.name(), w.address());
            }
        }

        WalletAction::Show { name } => {
            let name = match name {
                Some(name) => name,
                None => WorkproofConfig::load(data_dir)?.wallet,
            };
            let wallet = Wallet::load(&dir, &name)?;
            println!("Wallet:     {}", wallet.name());
            println!("Address:    {}", wallet.address());
            println!("Public key: {}", wallet.public_key_hex());
            println!("Created:    {}", wallet.created_at().format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}
