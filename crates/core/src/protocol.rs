//! JSON bodies exchanged between the orchestrator, clients, and agents.

use serde::{Deserialize, Serialize};

use crate::expression::{DispatchedTask, ExpressionSnapshot};
use crate::task::{ExpressionId, Operator, TaskId};

/// `POST /api/v1/calculate` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateResponse {
    pub id: ExpressionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionList {
    pub expressions: Vec<ExpressionSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpressionEnvelope {
    pub expression: ExpressionSnapshot,
}

/// `GET /internal/task` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: TaskPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operation: Operator,
    pub operation_time_ms: u64,
}

impl From<&DispatchedTask> for TaskPayload {
    fn from(task: &DispatchedTask) -> Self {
        Self {
            id: task.id,
            arg1: task.arg1,
            arg2: task.arg2,
            operation: task.operator,
            operation_time_ms: u64::try_from(task.max_duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `POST /internal/task` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultRequest {
    pub id: TaskId,
    pub result: f64,
}
