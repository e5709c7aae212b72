//! Expressions — one submitted formula, its task graph, and its in-flight
//! dispatch records, all behind a single lock.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::compiler::Postfix;
use crate::error::{Error, Result, TaskError};
use crate::graph::{self, Candidate, TaskGraph};
use crate::task::{ExpressionId, OperationLimits, Operator, Task, TaskId};
use crate::tracker::SentTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionStatus {
    HasReadyTasks,
    NoReadyTasks,
    Completed,
    Cancelled,
}

impl ExpressionStatus {
    /// `Completed` and `Cancelled` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExpressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HasReadyTasks => "has_ready_tasks",
            Self::NoReadyTasks => "no_ready_tasks",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Consistent point-in-time view of an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionSnapshot {
    pub id: ExpressionId,
    pub status: ExpressionStatus,
    pub result: Option<f64>,
}

/// A task handed to an agent.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchedTask {
    pub id: TaskId,
    pub arg1: f64,
    pub arg2: f64,
    pub operator: Operator,
    pub max_duration: Duration,
    pub dispatched_at: Instant,
}

/// Result of an accepted task result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskOutcome {
    /// Recorded; the expression still has work left.
    Accepted,
    /// That was the root task.
    ExpressionCompleted { result: f64 },
}

#[derive(Debug)]
struct ExpressionState {
    status: ExpressionStatus,
    result: Option<f64>,
    graph: TaskGraph,
    sent: SentTasks,
}

impl ExpressionState {
    fn change_status(&mut self, id: ExpressionId, status: ExpressionStatus) {
        if self.status.is_terminal() {
            if self.status != status {
                warn!(
                    expression = %id,
                    from = %self.status,
                    to = %status,
                    "Ignoring status change on finished expression"
                );
            }
            return;
        }
        self.status = status;
    }

    fn refresh_status(&mut self, id: ExpressionId) {
        let status = if self.graph.has_ready() {
            ExpressionStatus::HasReadyTasks
        } else {
            ExpressionStatus::NoReadyTasks
        };
        self.change_status(id, status);
    }
}

#[derive(Debug)]
pub struct Expression {
    id: ExpressionId,
    state: Mutex<ExpressionState>,
}

impl Expression {
    /// Build an expression from compiled postfix. An operator-free
    /// expression is complete immediately.
    pub fn new(id: ExpressionId, postfix: &[Postfix], limits: &OperationLimits) -> Result<Self> {
        let graph = graph::build(id, postfix, limits)?;

        let (status, result) = if graph.is_empty() {
            (ExpressionStatus::Completed, graph.result())
        } else if graph.has_ready() {
            (ExpressionStatus::HasReadyTasks, None)
        } else {
            (ExpressionStatus::NoReadyTasks, None)
        };

        Ok(Self {
            id,
            state: Mutex::new(ExpressionState {
                status,
                result,
                graph,
                sent: SentTasks::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, ExpressionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> ExpressionId {
        self.id
    }

    pub fn status(&self) -> ExpressionStatus {
        self.lock().status
    }

    pub fn result(&self) -> Option<f64> {
        self.lock().result
    }

    pub fn snapshot(&self) -> ExpressionSnapshot {
        let state = self.lock();
        ExpressionSnapshot {
            id: self.id,
            status: state.status,
            result: state.result,
        }
    }

    /// Copy of the task list, for inspection.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().graph.tasks().to_vec()
    }

    /// Number of dispatched tasks awaiting a result.
    pub fn in_flight(&self) -> usize {
        self.lock().sent.len()
    }

    /// Hand out the next ready task, if any, and record the dispatch.
    pub fn dispatch_next(&self, now: Instant) -> Option<DispatchedTask> {
        let mut state = self.lock();
        if state.status != ExpressionStatus::HasReadyTasks {
            return None;
        }

        let task = match state.graph.next_candidate() {
            Candidate::Ready(task) => task,
            Candidate::Waiting | Candidate::Exhausted => {
                state.refresh_status(self.id);
                return None;
            }
        };
        let Some((arg1, arg2)) = task.operands() else {
            warn!(expression = %self.id, task = %task.id, "Ready task is missing an operand");
            return None;
        };

        let sent = state.sent.record(&task, now);
        state.refresh_status(self.id);
        debug!(expression = %self.id, task = %task.id, "Dispatched {task}");

        Some(DispatchedTask {
            id: task.id,
            arg1,
            arg2,
            operator: task.operator,
            max_duration: task.max_duration,
            dispatched_at: sent.dispatched_at,
        })
    }

    /// Accept the result of a dispatched task observed at `observed_at`.
    ///
    /// A result later than the operator's limit cancels the whole
    /// expression. Results for tasks that were never dispatched, were
    /// already confirmed, or belong to a finished expression are `NotFound`.
    pub fn complete_task(
        &self,
        task_id: TaskId,
        value: f64,
        observed_at: Instant,
    ) -> Result<TaskOutcome> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.status.is_terminal() {
            return Err(TaskError::NotFound(task_id).into());
        }
        let Some(sent) = state.sent.take(task_id) else {
            return Err(TaskError::NotFound(task_id).into());
        };
        let Some(task) = state.graph.task(sent.index) else {
            return Err(Error::Internal(format!(
                "dispatch record for task {task_id} points past the task list"
            )));
        };
        let (operator, expected, operation) = (task.operator, task.max_duration, task.index);

        let actual = observed_at.saturating_duration_since(sent.dispatched_at);
        if actual > expected {
            state.change_status(self.id, ExpressionStatus::Cancelled);
            state.sent.clear();
            warn!(
                expression = %self.id,
                task = %task_id,
                ?expected,
                ?actual,
                "Task result arrived late, expression cancelled"
            );
            return Err(TaskError::Timeout {
                operator,
                expected,
                actual,
                expression: self.id,
                operation,
            }
            .into());
        }

        if let Err(e) = state.graph.record_result(sent.index, value) {
            state.sent.restore(sent);
            return Err(e);
        }

        if let Some(result) = state.graph.result() {
            state.result = Some(result);
            state.change_status(self.id, ExpressionStatus::Completed);
            info!(expression = %self.id, result, "Expression completed");
            return Ok(TaskOutcome::ExpressionCompleted { result });
        }

        state.refresh_status(self.id);
        Ok(TaskOutcome::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn limits() -> OperationLimits {
        OperationLimits::uniform(Duration::from_millis(500))
    }

    fn expression(text: &str) -> Expression {
        Expression::new(ExpressionId(1), &compile(text).unwrap(), &limits()).unwrap()
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn drives_two_plus_two_times_four_to_completion() {
        let expr = expression("2+2*4");
        let t0 = Instant::now();
        assert_eq!(expr.status(), ExpressionStatus::HasReadyTasks);

        let first = expr.dispatch_next(t0).unwrap();
        assert_eq!((first.arg1, first.arg2, first.operator), (2.0, 4.0, Operator::Mul));
        assert_eq!(expr.status(), ExpressionStatus::NoReadyTasks);
        assert!(expr.dispatch_next(t0).is_none());

        let outcome = expr.complete_task(first.id, 8.0, t0 + ms(10)).unwrap();
        assert_eq!(outcome, TaskOutcome::Accepted);
        assert_eq!(expr.status(), ExpressionStatus::HasReadyTasks);

        let root = expr.dispatch_next(t0 + ms(20)).unwrap();
        assert_eq!((root.arg1, root.arg2, root.operator), (2.0, 8.0, Operator::Add));
        let outcome = expr.complete_task(root.id, 10.0, t0 + ms(30)).unwrap();
        assert_eq!(outcome, TaskOutcome::ExpressionCompleted { result: 10.0 });

        let snap = expr.snapshot();
        assert_eq!(snap.status, ExpressionStatus::Completed);
        assert_eq!(snap.result, Some(10.0));
    }

    #[test]
    fn late_result_cancels_expression() {
        let expr = expression("4*2+3*5");
        let t0 = Instant::now();
        let a = expr.dispatch_next(t0).unwrap();
        let b = expr.dispatch_next(t0).unwrap();

        let err = expr.complete_task(a.id, 8.0, t0 + ms(900)).unwrap_err();
        match err {
            Error::Task(TaskError::Timeout {
                operator,
                expected,
                expression,
                operation,
                ..
            }) => {
                assert_eq!(operator, Operator::Mul);
                assert_eq!(expected, Duration::from_millis(500));
                assert_eq!(expression, ExpressionId(1));
                assert_eq!(operation, 0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(expr.status(), ExpressionStatus::Cancelled);
        assert_eq!(expr.in_flight(), 0);

        let err = expr.complete_task(b.id, 15.0, t0 + ms(1)).unwrap_err();
        assert!(matches!(err, Error::Task(TaskError::NotFound(_))));
        assert!(expr.dispatch_next(t0).is_none());
        assert_eq!(expr.result(), None);
    }

    #[test]
    fn duplicate_or_unknown_result_is_not_found() {
        let expr = expression("1+2+3");
        let t0 = Instant::now();
        let first = expr.dispatch_next(t0).unwrap();
        expr.complete_task(first.id, 3.0, t0).unwrap();

        let err = expr.complete_task(first.id, 3.0, t0).unwrap_err();
        assert!(matches!(err, Error::Task(TaskError::NotFound(_))));

        let never_sent = TaskId::new(ExpressionId(1), 1);
        let err = expr.complete_task(never_sent, 6.0, t0).unwrap_err();
        assert!(matches!(err, Error::Task(TaskError::NotFound(_))));
    }

    #[test]
    fn deadline_runs_from_each_dispatch() {
        // 1+2 | 3+4 | <0>*<1>, all limited to 500ms.
        let expr = expression("(1+2)*(3+4)");
        let t0 = Instant::now();
        let a = expr.dispatch_next(t0).unwrap();
        let b = expr.dispatch_next(t0 + ms(400)).unwrap();
        assert_eq!(b.dispatched_at, t0 + ms(400));

        // 800ms after the expression's first dispatch, 400ms after b's.
        expr.complete_task(b.id, 7.0, t0 + ms(800)).unwrap();
        expr.complete_task(a.id, 3.0, t0 + ms(450)).unwrap();
        let root = expr.dispatch_next(t0 + ms(900)).unwrap();
        let outcome = expr.complete_task(root.id, 21.0, t0 + ms(1400)).unwrap();
        assert_eq!(outcome, TaskOutcome::ExpressionCompleted { result: 21.0 });
    }

    #[test]
    fn observation_before_dispatch_counts_as_no_time() {
        let expr = expression("1+1");
        let t0 = Instant::now();
        let task = expr.dispatch_next(t0 + ms(50)).unwrap();
        let outcome = expr.complete_task(task.id, 2.0, t0).unwrap();
        assert_eq!(outcome, TaskOutcome::ExpressionCompleted { result: 2.0 });
    }

    #[test]
    fn number_only_expression_completes_at_creation() {
        let expr = expression("7.5");
        assert_eq!(
            expr.snapshot(),
            ExpressionSnapshot {
                id: ExpressionId(1),
                status: ExpressionStatus::Completed,
                result: Some(7.5),
            }
        );
        assert!(expr.dispatch_next(Instant::now()).is_none());
    }

    #[test]
    fn terminal_status_is_absorbing() {
        let expr = expression("1+1");
        let mut state = expr.lock();
        state.change_status(expr.id, ExpressionStatus::Cancelled);
        state.change_status(expr.id, ExpressionStatus::HasReadyTasks);
        assert_eq!(state.status, ExpressionStatus::Cancelled);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ExpressionStatus::HasReadyTasks).unwrap();
        assert_eq!(json, "\"has_ready_tasks\"");
        assert_eq!(ExpressionStatus::NoReadyTasks.to_string(), "no_ready_tasks");
    }
}
