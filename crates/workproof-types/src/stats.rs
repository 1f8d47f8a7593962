use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::WorkRecord;
use super::task::{TaskStatus, TaskType};

/// Value is accumulated in millionths so that folding is exact and order-independent.
const VALUE_SCALE: f64 = 1_000_000.0;

/// Aggregate counters over all finalized records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub failed_tasks: u64,
    pub total_tokens: u64,
    pub total_code_lines: u64,
    pub total_words: u64,
    pub bugs_fixed: u64,
    pub total_value: f64,
    /// Exact accumulator behind `total_value`; not part of the JSON form.
    #[serde(skip)]
    pub total_value_micros: i64,
    pub by_task_type: BTreeMap<TaskType, u64>,
}

impl Stats {
    /// Fold one record in. Completed records contribute every aggregate;
    /// failed records bump only the total and failure counters; pending records are ignored.
    pub fn fold(&mut self, record: &WorkRecord) {
        match record.status {
            TaskStatus::Pending => {}
            TaskStatus::Failed => {
                self.total_tasks += 1;
                self.failed_tasks += 1;
            }
            TaskStatus::Completed => {
                let m = &record.metrics;
                self.total_tasks += 1;
                self.completed_tasks += 1;
                self.total_tokens = self.total_tokens.saturating_add(m.total_tokens());
                self.total_code_lines = self.total_code_lines.saturating_add(m.code_lines);
                self.total_words = self.total_words.saturating_add(m.words_written);
                self.bugs_fixed = self.bugs_fixed.saturating_add(m.bugs_fixed);
                *self.by_task_type.entry(record.task_type).or_insert(0) += 1;

                let micros = (record.value.unwrap_or(0.0) * VALUE_SCALE).round() as i64;
                self.total_value_micros = self.total_value_micros.saturating_add(micros);
                self.total_value = self.total_value_micros as f64 / VALUE_SCALE;
            }
        }
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a WorkRecord>) -> Self {
        let mut stats = Stats::default();
        for record in records {
            stats.fold(record);
        }
        stats
    }
}
