use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::block::{Block, verify_chain};
use crate::seal::{SealPolicy, SealReport, seal};
use crate::traits::ChainStore;
use workproof_types::{Result, WorkproofError};

/// Configuration for a miner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinerConfig {
    pub policy: SealPolicy,
    /// Fixed value credited to the miner per block.
    pub reward: f64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            policy: SealPolicy::default(),
            reward: 10.0,
        }
    }
}

struct ChainState {
    blocks: Vec<Block>,
    working: bool,
}

/// Owner of the block sequence. One lock guards the chain and the working flag;
/// sealing runs entirely under that lock.
pub struct Miner {
    state: RwLock<ChainState>,
    address: String,
    config: MinerConfig,
    store: Arc<dyn ChainStore>,
}

impl Miner {
    /// Load and verify the persisted chain. A chain that fails to load or verify
    /// is returned as an error; callers treat it as fatal.
    pub async fn open(
        address: impl Into<String>,
        config: MinerConfig,
        store: Arc<dyn ChainStore>,
    ) -> Result<Self> {
        let blocks = store.load().await?;
        verify_chain(&blocks, config.policy.difficulty)?;

        let address = address.into();
        tracing::info!(height = blocks.len(), miner = %address, "Chain loaded");

        Ok(Self {
            state: RwLock::new(ChainState {
                blocks,
                working: false,
            }),
            address,
            config,
            store,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Seal and append the next block regardless of the working flag.
    pub async fn mine_block(&self) -> Result<SealReport> {
        let mut state = self.state.write().await;
        self.seal_next(&mut state).await
    }

    /// Seal the next block only if mining is switched on. The flag is read under
    /// the same guard as the seal, so nothing is minted once `stop` has returned.
    pub async fn mine_if_working(&self) -> Option<Result<SealReport>> {
        let mut state = self.state.write().await;
        if !state.working {
            return None;
        }
        Some(self.seal_next(&mut state).await)
    }

    async fn seal_next(&self, state: &mut ChainState) -> Result<SealReport> {
        let previous_hash = state
            .blocks
            .last()
            .map(|b| b.hash.clone())
            .unwrap_or_default();
        let candidate = Block::candidate(
            state.blocks.len() as u64,
            Utc::now().timestamp(),
            previous_hash,
            self.address.clone(),
            self.config.reward,
        );

        // Nonce search is CPU-bound; the write guard stays held across it.
        let policy = self.config.policy;
        let report = tokio::task::spawn_blocking(move || seal(candidate, &policy))
            .await
            .map_err(|e| WorkproofError::SealTask(e.to_string()))??;
        if report.exhausted() {
            tracing::warn!(
                index = report.block.index,
                attempts = report.attempts,
                difficulty = self.config.policy.difficulty,
                "Nonce search exhausted, appending unsealed block"
            );
        } else {
            tracing::info!(
                index = report.block.index,
                nonce = report.block.nonce,
                hash = %report.block.hash,
                "Block sealed"
            );
        }

        state.blocks.push(report.block.clone());
        if let Err(e) = self.store.save(&state.blocks).await {
            tracing::error!("Failed to persist chain: {}", e);
        }
        Ok(report)
    }

    pub async fn start(&self) {
        self.state.write().await.working = true;
        tracing::info!("Mining started");
    }

    /// Suppress future ticks. An in-flight seal finishes first.
    pub async fn stop(&self) {
        self.state.write().await.working = false;
        tracing::info!("Mining stopped");
    }

    pub async fn is_working(&self) -> bool {
        self.state.read().await.working
    }

    /// Sum of block values credited to `address`.
    pub async fn balance(&self, address: &str) -> f64 {
        self.state
            .read()
            .await
            .blocks
            .iter()
            .filter(|b| b.miner == address)
            .map(|b| b.value)
            .sum()
    }

    pub async fn blocks(&self) -> Vec<Block> {
        self.state.read().await.blocks.clone()
    }

    pub async fn height(&self) -> u64 {
        self.state.read().await.blocks.len() as u64
    }

    pub async fn latest_hash(&self) -> Option<String> {
        self.state.read().await.blocks.last().map(|b| b.hash.clone())
    }

    pub async fn verify(&self) -> Result<()> {
        let state = self.state.read().await;
        verify_chain(&state.blocks, self.config.policy.difficulty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryChainStore;
    use crate::seal::ExhaustionPolicy;
    use crate::store::FileChainStore;
    use async_trait::async_trait;
    use tempfile::tempdir;

    fn config(difficulty: usize) -> MinerConfig {
        MinerConfig {
            policy: SealPolicy {
                difficulty,
                max_attempts: 100_000,
                on_exhaustion: ExhaustionPolicy::AcceptUnsealed,
            },
            reward: 10.0,
        }
    }

    async fn miner(difficulty: usize) -> (Miner, MemoryChainStore) {
        let store = MemoryChainStore::new();
        let miner = Miner::open("miner-a", config(difficulty), Arc::new(store.clone()))
            .await
            .unwrap();
        (miner, store)
    }

    #[tokio::test]
    async fn test_mined_chain_links_and_verifies() {
        let (miner, store) = miner(2).await;
        for _ in 0..3 {
            miner.mine_block().await.unwrap();
        }

        let blocks = miner.blocks().await;
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].previous_hash, "");
        for (i, b) in blocks.iter().enumerate() {
            assert_eq!(b.index, i as u64);
            assert_eq!(b.hash, b.compute_hash());
            assert!(b.sealed);
            assert!(b.hash.starts_with("00"));
            if i > 0 {
                assert_eq!(b.previous_hash, blocks[i - 1].hash);
            }
        }
        assert_eq!(miner.latest_hash().await, Some(blocks[2].hash.clone()));
        assert!(miner.verify().await.is_ok());
        assert_eq!(store.save_count(), 3);
    }

    #[tokio::test]
    async fn test_balance_sums_rewards_per_address() {
        let (miner, _) = miner(1).await;
        for _ in 0..3 {
            miner.mine_block().await.unwrap();
        }
        assert_eq!(miner.balance("miner-a").await, 30.0);
        assert_eq!(miner.balance("someone-else").await, 0.0);
    }

    #[tokio::test]
    async fn test_exhaustion_with_reject_appends_nothing() {
        let store = MemoryChainStore::new();
        let cfg = MinerConfig {
            policy: SealPolicy {
                difficulty: 64,
                max_attempts: 5,
                on_exhaustion: ExhaustionPolicy::Reject,
            },
            reward: 10.0,
        };
        let miner = Miner::open("m", cfg, Arc::new(store.clone())).await.unwrap();

        let err = miner.mine_block().await.unwrap_err();
        assert!(matches!(err, WorkproofError::SealExhausted { index: 0, .. }));
        assert_eq!(miner.height().await, 0);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_with_accept_appends_unsealed() {
        let cfg = MinerConfig {
            policy: SealPolicy {
                difficulty: 64,
                max_attempts: 5,
                on_exhaustion: ExhaustionPolicy::AcceptUnsealed,
            },
            reward: 10.0,
        };
        let miner = Miner::open("m", cfg, Arc::new(MemoryChainStore::new()))
            .await
            .unwrap();

        let report = miner.mine_block().await.unwrap();
        assert!(report.exhausted());
        assert_eq!(miner.height().await, 1);
        assert!(!miner.blocks().await[0].sealed);
        assert!(miner.verify().await.is_ok());
    }

    #[tokio::test]
    async fn test_mine_if_working_respects_flag() {
        let (miner, _) = miner(1).await;
        assert!(miner.mine_if_working().await.is_none());

        miner.start().await;
        assert!(miner.is_working().await);
        assert!(miner.mine_if_working().await.unwrap().is_ok());

        miner.stop().await;
        assert!(miner.mine_if_working().await.is_none());
        assert_eq!(miner.height().await, 1);
    }

    struct BrokenChainStore;

    #[async_trait]
    impl ChainStore for BrokenChainStore {
        async fn load(&self) -> Result<Vec<Block>> {
            Ok(Vec::new())
        }

        async fn save(&self, _blocks: &[Block]) -> Result<()> {
            Err(WorkproofError::Storage("read-only filesystem".into()))
        }
    }

    #[tokio::test]
    async fn test_save_failure_keeps_chain_in_memory() {
        let miner = Miner::open("miner-a", config(1), Arc::new(BrokenChainStore))
            .await
            .unwrap();

        let report = miner.mine_block().await.unwrap();
        assert!(!report.exhausted());
        assert_eq!(miner.height().await, 1);
        assert_eq!(miner.balance("miner-a").await, 10.0);

        miner.mine_block().await.unwrap();
        assert_eq!(miner.height().await, 2);
        assert!(miner.verify().await.is_ok());
    }

    #[tokio::test]
    async fn test_seal_does_not_starve_other_tasks() {
        let cfg = MinerConfig {
            policy: SealPolicy {
                difficulty: 64,
                max_attempts: 500_000,
                on_exhaustion: ExhaustionPolicy::Reject,
            },
            reward: 10.0,
        };
        let miner = Arc::new(
            Miner::open("m", cfg, Arc::new(MemoryChainStore::new()))
                .await
                .unwrap(),
        );
        let sealing = tokio::spawn({
            let miner = miner.clone();
            async move { miner.mine_block().await }
        });
        tokio::task::yield_now().await;

        for _ in 0..3 {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
        assert!(!sealing.is_finished());

        assert!(matches!(
            sealing.await.unwrap(),
            Err(WorkproofError::SealExhausted { index: 0, .. })
        ));
        assert_eq!(miner.height().await, 0);
    }

    #[tokio::test]
    async fn test_reload_from_file() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileChainStore::new(dir.path()));
        {
            let miner = Miner::open("m", config(1), store.clone()).await.unwrap();
            miner.mine_block().await.unwrap();
            miner.mine_block().await.unwrap();
        }

        let reopened = Miner::open("m", config(1), store).await.unwrap();
        assert_eq!(reopened.height().await, 2);
        assert_eq!(reopened.balance("m").await, 20.0);

        reopened.mine_block().await.unwrap();
        assert!(reopened.verify().await.is_ok());
    }

    #[tokio::test]
    async fn test_tampered_chain_is_rejected_at_open() {
        let (miner, store) = miner(1).await;
        miner.mine_block().await.unwrap();
        miner.mine_block().await.unwrap();

        let mut blocks = store.load().await.unwrap();
        blocks[0].value = 500.0;
        let tampered = MemoryChainStore::with_blocks(blocks);

        let err = Miner::open("m", config(1), Arc::new(tampered))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, WorkproofError::ChainIntegrity(_)));
    }
}
