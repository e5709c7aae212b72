//! In-flight task tracking.

use std::collections::HashMap;
use std::time::Instant;

use crate::task::{Task, TaskId};

/// A task that has been handed to an agent and not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentTask {
    pub task_id: TaskId,
    /// Index of the task in its expression's graph.
    pub index: usize,
    /// Monotonic dispatch time; deadlines are measured from here.
    pub dispatched_at: Instant,
}

/// Dispatch records for one expression. Each record is consumed at most once.
#[derive(Debug, Default)]
pub struct SentTasks {
    records: HashMap<TaskId, SentTask>,
}

impl SentTasks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, task: &Task, now: Instant) -> SentTask {
        let sent = SentTask {
            task_id: task.id,
            index: task.index as usize,
            dispatched_at: now,
        };
        self.restore(sent);
        sent
    }

    /// Put back a record taken with [`take`](Self::take).
    pub fn restore(&mut self, sent: SentTask) {
        self.records.insert(sent.task_id, sent);
    }

    pub fn take(&mut self, task_id: TaskId) -> Option<SentTask> {
        self.records.remove(&task_id)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
