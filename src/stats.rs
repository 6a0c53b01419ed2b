// Aggregate statistics over the task collection

use crate::models::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub overdue: usize,
    /// Percentage of tasks completed, 0 when there are no tasks
    pub completion_rate: f64,
}

impl TodoStats {
    pub fn compute(tasks: &[Task], today: NaiveDate) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();

        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            completed,
            active: total - completed,
            overdue,
            completion_rate,
        }
    }

    pub fn rounded_rate(&self) -> u8 {
        self.completion_rate.round().clamp(0.0, 100.0) as u8
    }
}
