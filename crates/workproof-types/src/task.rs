use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::WorkproofError;

/// Kind of work an agent performed. Upstream classification picks one per task.
/// Serialized as its canonical name so it can key TOML and JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TaskType {
    Coding,
    Writing,
    Research,
    Debug,
    Deploy,
    Review,
    Doc,
    Analysis,
}

impl TaskType {
    pub const ALL: [TaskType; 8] = [
        TaskType::Coding,
        TaskType::Writing,
        TaskType::Research,
        TaskType::Debug,
        TaskType::Deploy,
        TaskType::Review,
        TaskType::Doc,
        TaskType::Analysis,
    ];

    /// Canonical lowercase name. This string feeds the proof hash and must not change.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Coding => "coding",
            TaskType::Writing => "writing",
            TaskType::Research => "research",
            TaskType::Debug => "debug",
            TaskType::Deploy => "deploy",
            TaskType::Review => "review",
            TaskType::Doc => "doc",
            TaskType::Analysis => "analysis",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = WorkproofError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| WorkproofError::UnknownTaskType(s.to_string()))
    }
}

impl From<TaskType> for String {
    fn from(t: TaskType) -> Self {
        t.as_str().to_string()
    }
}

impl TryFrom<String> for TaskType {
    type Error = WorkproofError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Lifecycle status of a work record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Attempt a state transition given an event.
    /// Both terminal states reject every event.
    pub fn transition(self, event: TaskEvent) -> super::error::Result<TaskStatus> {
        match (self, event) {
            (TaskStatus::Pending, TaskEvent::Complete) => Ok(TaskStatus::Completed),
            (TaskStatus::Pending, TaskEvent::Fail) => Ok(TaskStatus::Failed),
            (status, event) => Err(WorkproofError::InvalidStateTransition { from: status, event }),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events that finalize a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskEvent {
    Complete,
    Fail,
}
