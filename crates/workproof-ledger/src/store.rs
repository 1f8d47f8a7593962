use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::block::Block;
use crate::traits::ChainStore;
use workproof_types::{Result, WorkproofError};

/// Chain persisted as a single `blocks.json` array, written atomically.
#[derive(Debug, Clone)]
pub struct FileChainStore {
    path: PathBuf,
}

impl FileChainStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("blocks.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChainStore for FileChainStore {
    async fn load(&self) -> Result<Vec<Block>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            WorkproofError::ChainIntegrity(format!(
                "cannot parse {}: {e}",
                self.path.display()
            ))
        })
    }

    async fn save(&self, blocks: &[Block]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(blocks)?;
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}
