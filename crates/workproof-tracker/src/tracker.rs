use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::attestation::Attestation;
use crate::classify::{SessionEvent, classify, session_metrics};
use crate::store::RecordStore;
use workproof_types::{
    Result, Signer, Stats, TaskMetrics, TaskType, ValueModel, WorkRecord, WorkproofError,
};

#[derive(Default)]
struct TrackerState {
    /// Insertion order.
    records: Vec<WorkRecord>,
    index: HashMap<Uuid, usize>,
    stats: Stats,
}

impl TrackerState {
    fn insert(&mut self, record: WorkRecord) {
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut WorkRecord> {
        let idx = *self.index.get(&id).ok_or(WorkproofError::TaskNotFound(id))?;
        Ok(&mut self.records[idx])
    }
}

/// Owner of all work records and their aggregate stats.
pub struct Tracker {
    state: RwLock<TrackerState>,
    model: ValueModel,
    store: Arc<dyn RecordStore>,
    signer: Option<Arc<dyn Signer>>,
}

impl Tracker {
    /// Prepare storage and rebuild records and stats from it.
    pub async fn open(model: ValueModel, store: Arc<dyn RecordStore>) -> Result<Self> {
        store.init().await?;

        let mut loaded = store.load_all().await?;
        loaded.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));

        let mut state = TrackerState::default();
        for record in loaded {
            if state.index.contains_key(&record.id) {
                tracing::warn!(task_id = %record.id, "Skipping duplicate stored record");
                continue;
            }
            state.stats.fold(&record);
            state.insert(record);
        }
        tracing::info!(
            records = state.records.len(),
            total_value = state.stats.total_value,
            "Tracker loaded"
        );

        Ok(Self {
            state: RwLock::new(state),
            model,
            store,
            signer: None,
        })
    }

    /// Sign proof hashes of newly completed records with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn model(&self) -> &ValueModel {
        &self.model
    }

    pub async fn start_task(
        &self,
        agent_id: impl Into<String>,
        description: impl Into<String>,
        task_type: TaskType,
    ) -> WorkRecord {
        let record = WorkRecord::new(agent_id, description, task_type);
        tracing::debug!(task_id = %record.id, task_type = %task_type, "Task started");
        self.state.write().await.insert(record.clone());
        record
    }

    pub async fn complete_task(&self, id: Uuid, metrics: TaskMetrics) -> Result<WorkRecord> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;

        if let Err(e) = record.complete(metrics, &self.model) {
            tracing::error!(task_id = %id, "Rejected completion: {}", e);
            return Err(e);
        }
        if let (Some(signer), Some(hash)) = (&self.signer, &record.proof_hash) {
            match signer.sign(hash.as_bytes()) {
                Ok(signature) => record.signature = Some(signature),
                Err(e) => tracing::warn!(task_id = %id, "Failed to sign proof hash: {}", e),
            }
        }

        let snapshot = record.clone();
        state.stats.fold(&snapshot);
        self.persist(&snapshot).await;

        tracing::info!(
            task_id = %id,
            task_type = %snapshot.task_type,
            value = snapshot.value.unwrap_or(0.0),
            "Task completed"
        );
        Ok(snapshot)
    }

    pub async fn fail_task(&self, id: Uuid, message: &str) -> Result<WorkRecord> {
        let mut state = self.state.write().await;
        let record = state.get_mut(id)?;

        if let Err(e) = record.fail(message) {
            tracing::error!(task_id = %id, "Rejected failure: {}", e);
            return Err(e);
        }

        let snapshot = record.clone();
        state.stats.fold(&snapshot);
        self.persist(&snapshot).await;

        tracing::info!(task_id = %id, "Task failed");
        Ok(snapshot)
    }

    /// Classify one session event, then start and complete a task for it.
    pub async fn record_session(&self, agent_id: &str, event: &SessionEvent) -> Result<WorkRecord> {
        let task_type = classify(event);
        let record = self
            .start_task(agent_id, format!("Session: {}", event.session_id), task_type)
            .await;
        self.complete_task(record.id, session_metrics(event)).await
    }

    pub async fn stats(&self) -> Stats {
        self.state.read().await.stats.clone()
    }

    /// Records by completion time, newest first. Pending records sort last and
    /// ties keep insertion order. A limit of 0 returns everything.
    pub async fn records(&self, limit: usize) -> Vec<WorkRecord> {
        let mut records = self.state.read().await.records.clone();
        records.sort_by(|a, b| match (a.completed_at, b.completed_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
        if limit > 0 {
            records.truncate(limit);
        }
        records
    }

    pub async fn record(&self, id: Uuid) -> Result<WorkRecord> {
        let state = self.state.read().await;
        state
            .index
            .get(&id)
            .map(|&idx| state.records[idx].clone())
            .ok_or(WorkproofError::TaskNotFound(id))
    }

    /// Attest to the `n` most recent proof hashes (0 for all).
    pub async fn attestation(&self, n: usize) -> Attestation {
        let hashes = self
            .records(0)
            .await
            .into_iter()
            .filter_map(|r| r.proof_hash)
            .filter(|h| !h.is_empty());
        let hashes: Vec<String> = if n > 0 {
            hashes.take(n).collect()
        } else {
            hashes.collect()
        };
        Attestation::from_hashes(hashes)
    }

    async fn persist(&self, record: &WorkRecord) {
        if let Err(e) = self.store.save(record).await {
            tracing::error!(task_id = %record.id, "Failed to persist record: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileRecordStore, MemoryRecordStore};
    use std::time::Duration;
    use tempfile::tempdir;
    use workproof_types::TaskStatus;

    async fn tracker() -> (Tracker, MemoryRecordStore) {
        let store = MemoryRecordStore::new();
        let tracker = Tracker::open(ValueModel::default(), Arc::new(store.clone()))
            .await
            .unwrap();
        (tracker, store)
    }

    struct FixedSigner;

    impl Signer for FixedSigner {
        fn address(&self) -> &str {
            "fixed"
        }

        fn sign(&self, message: &[u8]) -> Result<String> {
            Ok(format!("sig:{}", message.len()))
        }
    }

    #[tokio::test]
    async fn test_complete_task_updates_stats_and_store() {
        let (tracker, store) = tracker().await;
        let r = tracker.start_task("agent", "parser", TaskType::Coding).await;
        assert_eq!(r.status, TaskStatus::Pending);
        assert!(store.is_empty());

        let done = tracker
            .complete_task(
                r.id,
                TaskMetrics {
                    code_lines: 100,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.verify_proof());
        assert!(done.signature.is_none());

        let stats = tracker.stats().await;
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_code_lines, 100);
        assert_eq!(store.get(r.id), Some(done));
    }

    #[tokio::test]
    async fn test_double_completion_is_rejected() {
        let (tracker, _) = tracker().await;
        let r = tracker.start_task("agent", "x", TaskType::Review).await;
        tracker.complete_task(r.id, TaskMetrics::default()).await.unwrap();

        let err = tracker
            .complete_task(r.id, TaskMetrics::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkproofError::InvalidStateTransition { .. }));
        assert!(tracker.fail_task(r.id, "late").await.is_err());
        assert_eq!(tracker.stats().await.total_tasks, 1);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let (tracker, _) = tracker().await;
        let id = Uuid::new_v4();
        assert!(matches!(
            tracker.complete_task(id, TaskMetrics::default()).await,
            Err(WorkproofError::TaskNotFound(missing)) if missing == id
        ));
        assert!(tracker.record(id).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_task_touches_only_failure_counters() {
        let (tracker, store) = tracker().await;
        let r = tracker.start_task("agent", "deploy", TaskType::Deploy).await;
        let failed = tracker.fail_task(r.id, "timeout").await.unwrap();

        assert_eq!(failed.description, "deploy [ERROR: timeout]");
        assert!(failed.value.is_none());
        let stats = tracker.stats().await;
        assert_eq!(
            stats,
            Stats {
                total_tasks: 1,
                failed_tasks: 1,
                ..Default::default()
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_records_limit_most_recent_first() {
        let (tracker, _) = tracker().await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let r = tracker.start_task("agent", format!("t{i}"), TaskType::Writing).await;
            tracker.complete_task(r.id, TaskMetrics::default()).await.unwrap();
            ids.push(r.id);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let pending = tracker.start_task("agent", "open", TaskType::Writing).await;

        let recent = tracker.records(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);

        let all = tracker.records(0).await;
        assert_eq!(all.len(), 6);
        assert_eq!(all[5].id, pending.id);
    }

    #[tokio::test]
    async fn test_attestation_uses_recent_proof_hashes() {
        let (tracker, _) = tracker().await;
        for i in 0..3 {
            let r = tracker.start_task("agent", format!("t{i}"), TaskType::Analysis).await;
            tracker.complete_task(r.id, TaskMetrics::default()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        let failed = tracker.start_task("agent", "bad", TaskType::Analysis).await;
        tracker.fail_task(failed.id, "x").await.unwrap();

        let att = tracker.attestation(2).await;
        let recent = tracker.records(0).await;
        let expected: Vec<String> = recent
            .iter()
            .filter_map(|r| r.proof_hash.clone())
            .take(2)
            .collect();
        assert_eq!(att.count, 2);
        assert_eq!(att.proof_hashes, expected);
        assert_eq!(tracker.attestation(0).await.count, 3);
    }

    #[tokio::test]
    async fn test_signer_signs_proof_hash() {
        let store = MemoryRecordStore::new();
        let tracker = Tracker::open(ValueModel::default(), Arc::new(store))
            .await
            .unwrap()
            .with_signer(Arc::new(FixedSigner));

        let r = tracker.start_task("agent", "x", TaskType::Coding).await;
        let done = tracker.complete_task(r.id, TaskMetrics::default()).await.unwrap();
        assert_eq!(done.signature.as_deref(), Some("sig:64"));
    }

    #[tokio::test]
    async fn test_record_session() {
        let (tracker, _) = tracker().await;
        let event = SessionEvent {
            session_id: "abc".into(),
            content: "docker push".into(),
            tokens_input: 10,
            tokens_output: 5,
            tools: Vec::new(),
        };
        let r = tracker.record_session("agent", &event).await.unwrap();
        assert_eq!(r.task_type, TaskType::Deploy);
        assert_eq!(r.description, "Session: abc");
        assert_eq!(r.metrics.total_tokens(), 15);
        assert_eq!(r.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_reload_ignores_second_copy_of_a_record() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileRecordStore::new(dir.path()));
        let id = {
            let tracker = Tracker::open(ValueModel::default(), store.clone()).await.unwrap();
            let r = tracker.start_task("agent", "x", TaskType::Coding).await;
            tracker
                .complete_task(
                    r.id,
                    TaskMetrics {
                        code_lines: 10,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            r.id
        };
        std::fs::copy(
            store.dir().join(format!("{id}.json")),
            store.dir().join("copy.json"),
        )
        .unwrap();

        let reopened = Tracker::open(ValueModel::default(), store).await.unwrap();
        let stats = reopened.stats().await;
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_code_lines, 10);
        assert_eq!(reopened.records(0).await.len(), 1);
        assert_eq!(reopened.record(id).await.unwrap().id, id);
    }

    struct BrokenRecordStore;

    #[async_trait::async_trait]
    impl RecordStore for BrokenRecordStore {
        async fn init(&self) -> Result<()> {
            Ok(())
        }

        async fn load_all(&self) -> Result<Vec<WorkRecord>> {
            Ok(Vec::new())
        }

        async fn save(&self, _record: &WorkRecord) -> Result<()> {
            Err(WorkproofError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn test_save_failure_keeps_memory_authoritative() {
        let tracker = Tracker::open(ValueModel::default(), Arc::new(BrokenRecordStore))
            .await
            .unwrap();
        let r = tracker.start_task("agent", "parser", TaskType::Coding).await;

        let done = tracker
            .complete_task(
                r.id,
                TaskMetrics {
                    code_lines: 25,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        let stats = tracker.stats().await;
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.total_code_lines, 25);
        assert_eq!(tracker.record(r.id).await.unwrap(), done);

        let other = tracker.start_task("agent", "deploy", TaskType::Deploy).await;
        assert!(tracker.fail_task(other.id, "boom").await.is_ok());
        assert_eq!(tracker.stats().await.failed_tasks, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_start_task_ids_are_unique() {
        let (tracker, _) = tracker().await;
        let tracker = Arc::new(tracker);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..50 {
                    ids.push(tracker.start_task("agent", "x", TaskType::Coding).await.id);
                }
                ids
            }));
        }

        let mut all = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(all.insert(id));
            }
        }
        assert_eq!(all.len(), 400);
        assert_eq!(tracker.records(0).await.len(), 400);
    }

    #[tokio::test]
    async fn test_reload_rebuilds_identical_stats() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileRecordStore::new(dir.path()));

        let before = {
            let tracker = Tracker::open(ValueModel::default(), store.clone()).await.unwrap();
            for (i, t) in TaskType::ALL.iter().enumerate() {
                let r = tracker.start_task("agent", format!("t{i}"), *t).await;
                if i % 3 == 0 {
                    tracker.fail_task(r.id, "nope").await.unwrap();
                } else {
                    let metrics = TaskMetrics {
                        tokens_input: 1_000 * i as u64,
                        code_lines: 7 * i as u64,
                        words_written: 300,
                        api_calls: 2,
                        ..Default::default()
                    };
                    tracker.complete_task(r.id, metrics).await.unwrap();
                }
            }
            tracker.stats().await
        };
        std::fs::write(store.dir().join("garbage.json"), "[]]").unwrap();

        let reopened = Tracker::open(ValueModel::default(), store).await.unwrap();
        assert_eq!(reopened.stats().await, before);
        assert_eq!(reopened.records(0).await.len(), TaskType::ALL.len());
    }

    #[tokio::test]
    async fn test_open_fails_when_storage_cannot_be_created() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let store = Arc::new(FileRecordStore::new(&blocker));
        let err = Tracker::open(ValueModel::default(), store).await.err().unwrap();
        assert!(matches!(err, WorkproofError::Storage(_)));
    }
}
