use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::WorkRecord;
use super::task::{TaskStatus, TaskType};

/// Valuation parameters. Built once and shared read-only; there is no global weight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueModel {
    /// Base weight per task type.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<TaskType, f64>,
    /// Weight for a task type absent from `weights`.
    #[serde(default)]
    pub default_weight: f64,
    #[serde(default = "default_code_rate")]
    pub code_rate: f64,
    #[serde(default = "default_bug_bonus")]
    pub bug_bonus: f64,
    #[serde(default = "default_word_rate")]
    pub word_rate: f64,
    /// Numerator of the api-efficiency term (`n / api_calls`).
    #[serde(default = "default_api_efficiency")]
    pub api_efficiency: f64,
    #[serde(default = "default_token_rate")]
    pub token_rate: f64,
    /// Status multiplier applied to the base weight of non-completed records.
    #[serde(default = "default_failed_multiplier")]
    pub failed_multiplier: f64,
}

fn default_weights() -> BTreeMap<TaskType, f64> {
    BTreeMap::from([
        (TaskType::Coding, 1.5),
        (TaskType::Debug, 2.0),
        (TaskType::Deploy, 1.8),
        (TaskType::Review, 1.2),
        (TaskType::Writing, 1.0),
        (TaskType::Research, 1.3),
        (TaskType::Doc, 0.8),
        (TaskType::Analysis, 1.4),
    ])
}

fn default_code_rate() -> f64 {
    0.01
}

fn default_bug_bonus() -> f64 {
    5.0
}

fn default_word_rate() -> f64 {
    0.001
}

fn default_api_efficiency() -> f64 {
    10.0
}

fn default_token_rate() -> f64 {
    0.0001
}

fn default_failed_multiplier() -> f64 {
    0.3
}

impl Default for ValueModel {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            default_weight: 0.0,
            code_rate: default_code_rate(),
            bug_bonus: default_bug_bonus(),
            word_rate: default_word_rate(),
            api_efficiency: default_api_efficiency(),
            token_rate: default_token_rate(),
            failed_multiplier: default_failed_multiplier(),
        }
    }
}

impl ValueModel {
    pub fn weight(&self, task_type: TaskType) -> f64 {
        self.weights
            .get(&task_type)
            .copied()
            .unwrap_or(self.default_weight)
    }

    /// Scalar value of a record from its status, type and metrics.
    pub fn value(&self, record: &WorkRecord) -> f64 {
        let completed = record.status == TaskStatus::Completed;
        let m = &record.metrics;

        let status_multiplier = if completed { 1.0 } else { self.failed_multiplier };
        let base_value = self.weight(record.task_type) * status_multiplier;

        let mut code_value = m.code_lines as f64 * self.code_rate;
        if m.bugs_fixed > 0 {
            code_value += m.bugs_fixed as f64 * self.bug_bonus;
        }

        let word_value = m.words_written as f64 * self.word_rate;

        let api_efficiency = if m.api_calls > 0 && completed {
            self.api_efficiency / m.api_calls as f64
        } else {
            0.0
        };

        let token_cost = m.total_tokens() as f64 * self.token_rate;

        (base_value + code_value + word_value + api_efficiency) - token_cost
    }
}
