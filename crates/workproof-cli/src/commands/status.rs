use anyhow::Result;

use workproof_types::Signer;

use crate::state::AppState;

/// Handle the `status` command: show a dashboard of work and mining state.
pub async fn handle(state: &AppState) -> Result<()> {
    let stats = state.tracker.stats().await;
    println!(
        "Tasks: {} total ({} completed, {} failed)",
        stats.total_tasks, stats.completed_tasks, stats.failed_tasks
    );
    println!("Value: {:.6}", stats.total_value);
    println!(
        "Output: {} tokens, {} code lines, {} words, {} bugs fixed",
        stats.total_tokens, stats.total_code_lines, stats.total_words, stats.bugs_fixed
    );
    if !stats.by_task_type.is_empty() {
        let breakdown: Vec<String> = stats
            .by_task_type
            .iter()
            .map(|(t, n)| format!("{t}: {n}"))
            .collect();
        println!("By type: {}", breakdown.join(", "));
    }

    let address = state.wallet.address();
    println!();
    println!("Wallet: {} ({})", state.wallet.name(), address);
    println!("Chain height: {}", state.miner.height().await);
    println!("Balance: {:.6}", state.miner.balance(address).await);
    println!("Data directory: {}", state.data_dir.display());
    Ok(())
}

/// Handle the `proof` command: print the attestation as JSON.
pub async fn proof(state: &AppState, limit: usize) -> Result<()> {
    let attestation = state.tracker.attestation(limit).await;
    println!("{}", serde_json::to_string_pretty(&attestation)?);
    Ok(())
}
