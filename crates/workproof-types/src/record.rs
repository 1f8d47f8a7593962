use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::error::Result;
use super::task::{TaskEvent, TaskStatus, TaskType};
use super::value::ValueModel;

/// Workload counters reported by the telemetry source when a task finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetrics {
    #[serde(default)]
    pub tokens_input: u64,
    #[serde(default)]
    pub tokens_output: u64,
    #[serde(default)]
    pub code_lines: u64,
    #[serde(default)]
    pub code_files: u64,
    #[serde(default)]
    pub words_written: u64,
    #[serde(default)]
    pub bugs_fixed: u64,
    #[serde(default)]
    pub api_calls: u64,
    #[serde(default)]
    pub errors_fixed: u64,
}

impl TaskMetrics {
    pub fn total_tokens(&self) -> u64 {
        self.tokens_input.saturating_add(self.tokens_output)
    }
}

/// One task's telemetry plus its computed value and proof hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: Uuid,
    pub agent_id: String,
    pub task_type: TaskType,
    pub description: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: TaskMetrics,
    /// Set on completion only. Failed records never carry a value.
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub proof_hash: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl WorkRecord {
    pub fn new(
        agent_id: impl Into<String>,
        description: impl Into<String>,
        task_type: TaskType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id: agent_id.into(),
            task_type,
            description: description.into(),
            status: TaskStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            metrics: TaskMetrics::default(),
            value: None,
            proof_hash: None,
            signature: None,
        }
    }

    /// Finalize as completed: record metrics, value and proof hash.
    /// The transition is checked before anything is mutated.
    pub fn complete(&mut self, metrics: TaskMetrics, model: &ValueModel) -> Result<()> {
        self.status = self.status.transition(TaskEvent::Complete)?;
        self.completed_at = Some(Utc::now());
        self.metrics = metrics;
        self.value = Some(model.value(self));
        self.proof_hash = Some(self.compute_proof_hash());
        Ok(())
    }

    /// Finalize as failed, appending the diagnostic to the description.
    pub fn fail(&mut self, message: &str) -> Result<()> {
        self.status = self.status.transition(TaskEvent::Fail)?;
        self.completed_at = Some(Utc::now());
        self.description = format!("{} [ERROR: {}]", self.description, message);
        Ok(())
    }

    /// Pipe-delimited preimage of the proof hash.
    pub fn proof_preimage(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.agent_id,
            self.task_type,
            self.description,
            self.status,
            self.metrics.tokens_input,
            self.metrics.tokens_output,
            self.metrics.code_lines,
            self.metrics.words_written,
            self.metrics.bugs_fixed,
            self.completed_at.map(|t| t.timestamp_millis()).unwrap_or(0),
        )
    }

    /// SHA-256 of the preimage, lowercase hex.
    pub fn compute_proof_hash(&self) -> String {
        format!("{:x}", Sha256::digest(self.proof_preimage().as_bytes()))
    }

    /// Recompute the proof hash and compare with the stored one.
    pub fn verify_proof(&self) -> bool {
        self.proof_hash
            .as_deref()
            .is_some_and(|stored| stored == self.compute_proof_hash())
    }
}
