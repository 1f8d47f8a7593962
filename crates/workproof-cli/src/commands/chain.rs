use anyhow::{Result, bail};

use workproof_types::Signer;

use crate::ChainAction;
use crate::state::AppState;

/// Handle the `mine` command: seal `blocks` blocks in the foreground.
pub async fn mine(state: &AppState, blocks: u64) -> Result<()> {
    for _ in 0..blocks {
        let report = state.miner.mine_block().await?;
        let b = &report.block;
        println!(
            "Block #{:<5} nonce {:<8} {}{}",
            b.index,
            b.nonce,
            b.hash,
            if report.exhausted() { "  (unsealed)" } else { "" }
        );
    }
    let address = state.wallet.address();
    println!(
        "Balance of {}: {:.6}",
        address,
        state.miner.balance(address).await
    );
    Ok(())
}

pub async fn balance(state: &AppState, address: Option<String>) -> Result<()> {
    let address = address.unwrap_or_else(|| state.wallet.address().to_string());
    println!("{}: {:.6}", address, state.miner.balance(&address).await);
    Ok(())
}

pub async fn handle(action: ChainAction, state: &AppState) -> Result<()> {
    match action {
        ChainAction::Show { last } => {
            let blocks = state.miner.blocks().await;
            if blocks.is_empty() {
                println!("Chain is empty.");
                return Ok(());
            }
            println!("Height: {}", blocks.len());
            for b in blocks.iter().rev().take(last) {
                println!(
                    "  #{:<5} {}  {}  {} {:.2}{}",
                    b.index,
                    b.hash,
                    chrono_time(b.timestamp),
                    b.miner,
                    b.value,
                    if b.sealed { "" } else { "  (unsealed)" }
                );
            }
        }

        ChainAction::Verify => {
            let height = state.miner.height().await;
            match state.miner.verify().await {
                Ok(()) => println!("Chain OK: {height} blocks verified"),
                Err(e) => bail!("Chain verification failed: {e}"),
            }
        }
    }
    Ok(())
}

fn chrono_time(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| secs.to_string())
}
