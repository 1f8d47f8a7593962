use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::miner::Miner;

/// Fixed-interval background cadence that seals a block on every tick while
/// the miner's working flag is set.
pub struct MiningLoop {
    miner: Arc<Miner>,
    interval: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl MiningLoop {
    pub fn new(miner: Arc<Miner>, interval: Duration, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            miner,
            interval,
            shutdown_rx,
        }
    }

    /// Run until shutdown is signalled. A seal in progress is never preempted.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Some(Err(e)) = self.miner.mine_if_working().await {
                        tracing::error!("Mining tick failed: {}", e);
                    }
                }
                Ok(()) = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        tracing::info!("Mining loop shutting down");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryChainStore;
    use crate::miner::MinerConfig;
    use crate::seal::SealPolicy;

    async fn wait_for_height(miner: &Miner, height: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while miner.height().await < height {
            assert!(Instant::now() < deadline, "miner never reached height {height}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_loop_mines_while_working_and_stops_cleanly() {
        let config = MinerConfig {
            policy: SealPolicy {
                difficulty: 1,
                ..Default::default()
            },
            reward: 10.0,
        };
        let miner = Arc::new(
            Miner::open("loop", config, Arc::new(MemoryChainStore::new()))
                .await
                .unwrap(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(
            MiningLoop::new(miner.clone(), Duration::from_millis(10), shutdown_rx).run(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(miner.height().await, 0);

        miner.start().await;
        wait_for_height(&miner, 2).await;

        miner.stop().await;
        let height = miner.height().await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(miner.height().await, height);
        assert!(miner.verify().await.is_ok());

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
