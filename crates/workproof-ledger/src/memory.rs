use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::block::Block;
use crate::traits::ChainStore;
use workproof_types::Result;

/// In-memory chain store for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryChainStore {
    blocks: Arc<RwLock<Vec<Block>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store as if a previous run had saved `blocks`.
    pub fn with_blocks(blocks: Vec<Block>) -> Self {
        Self {
            blocks: Arc::new(RwLock::new(blocks)),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainStore for MemoryChainStore {
    async fn load(&self) -> Result<Vec<Block>> {
        Ok(self.blocks.read().await.clone())
    }

    async fn save(&self, blocks: &[Block]) -> Result<()> {
        *self.blocks.write().await = blocks.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
