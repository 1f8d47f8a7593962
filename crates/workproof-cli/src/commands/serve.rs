use anyhow::{Context, Result};
use std::net::SocketAddr;

use tokio::sync::watch;
use workproof_ledger::MiningLoop;

use crate::state::AppState;

/// Handle the `serve` command: run the HTTP API and mining loop until Ctrl-C.
pub async fn handle(state: &AppState, mine: bool, listen: Option<SocketAddr>) -> Result<()> {
    let interval = state.config.mining.interval()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mining = tokio::spawn(
        MiningLoop::new(state.miner.clone(), interval, shutdown_rx.clone()).run(),
    );
    if mine || state.config.mining.autostart {
        state.miner.start().await;
    }

    let addr = listen.unwrap_or(state.config.listen_addr);
    let app_state = workproof_server::AppState::new(
        state.tracker.clone(),
        state.miner.clone(),
        state.config.agent_id.as_str(),
    );
    let mut server = tokio::spawn(workproof_server::serve(app_state, addr, shutdown_rx));

    let finished = tokio::select! {
        res = &mut server => Some(res),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            None
        }
    };

    let _ = shutdown_tx.send(true);
    let result = match finished {
        Some(res) => res,
        None => server.await,
    };
    mining.await.context("Mining loop panicked")?;
    result
        .context("Server task panicked")?
        .with_context(|| format!("Server on {addr} failed"))?;
    Ok(())
}
