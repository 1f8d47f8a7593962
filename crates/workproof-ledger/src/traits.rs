use async_trait::async_trait;

use crate::block::Block;
use workproof_types::Result;

/// Durable home of the block sequence. Every save replaces the whole chain.
#[async_trait]
pub trait ChainStore: Send + Sync {
    /// Load the persisted chain. A missing chain is an empty one.
    async fn load(&self) -> Result<Vec<Block>>;

    /// Persist the full chain.
    async fn save(&self, blocks: &[Block]) -> Result<()>;
}
