use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use workproof_types::{Result, WorkRecord};

/// Durable home of finalized work records, one entry per record id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Prepare the backing storage. Failure here is fatal to the tracker.
    async fn init(&self) -> Result<()>;

    /// Load every readable record. Unreadable entries are skipped, not fatal.
    async fn load_all(&self) -> Result<Vec<WorkRecord>>;

    /// Insert or overwrite one record.
    async fn save(&self, record: &WorkRecord) -> Result<()>;
}

/// One pretty-printed JSON file per record under `<data_dir>/records/`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("records"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<WorkRecord>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping unreadable record: {}", e);
                    continue;
                }
            };
            match serde_json::from_str::<WorkRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Skipping malformed record: {}", e);
                }
            }
        }

        Ok(records)
    }

    async fn save(&self, record: &WorkRecord) -> Result<()> {
        let path = self.record_path(record.id);
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

/// In-memory record store for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Arc<DashMap<Uuid, WorkRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<WorkRecord> {
        self.records.get(&id).map(|r| r.clone())
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<WorkRecord>> {
        Ok(self.records.iter().map(|r| r.value().clone()).collect())
    }

    async fn save(&self, record: &WorkRecord) -> Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }
}
