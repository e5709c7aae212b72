//! Expression registry — owns every submitted expression for the lifetime
//! of the process.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::info;

use crate::compiler;
use crate::error::{Error, Result, TaskError};
use crate::expression::{
    DispatchedTask, Expression, ExpressionSnapshot, ExpressionStatus, TaskOutcome,
};
use crate::task::{ExpressionId, OperationLimits, TaskId};

#[derive(Debug, Default)]
struct Inner {
    next_id: u32,
    expressions: BTreeMap<ExpressionId, Arc<Expression>>,
}

/// Thread-safe store of expressions, shared by all request handlers.
#[derive(Debug)]
pub struct ExpressionRegistry {
    limits: OperationLimits,
    inner: RwLock<Inner>,
}

impl ExpressionRegistry {
    pub fn new(limits: OperationLimits) -> Self {
        Self {
            limits,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn limits(&self) -> &OperationLimits {
        &self.limits
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Compile and register an expression, returning its new ID.
    pub fn submit(&self, text: &str) -> Result<ExpressionId> {
        let postfix = compiler::compile(text)?;
        if postfix.is_empty() {
            return Err(Error::EmptyExpression);
        }

        let mut inner = self.write();
        let id = ExpressionId(inner.next_id);
        let next_id = inner
            .next_id
            .checked_add(1)
            .ok_or_else(|| Error::Internal("expression IDs exhausted".into()))?;

        let expression = Expression::new(id, &postfix, &self.limits)?;
        let tasks = expression.tasks().len();
        inner.next_id = next_id;
        inner.expressions.insert(id, Arc::new(expression));
        drop(inner);

        info!(expression = %id, tasks, "Registered expression");
        Ok(id)
    }

    pub fn get(&self, id: ExpressionId) -> Option<Arc<Expression>> {
        self.read().expressions.get(&id).cloned()
    }

    /// Snapshots of every expression, ordered by ID.
    pub fn list(&self) -> Vec<ExpressionSnapshot> {
        self.read()
            .expressions
            .values()
            .map(|e| e.snapshot())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Any expression that currently has a dispatchable task.
    pub fn ready_expression(&self) -> Option<Arc<Expression>> {
        self.read()
            .expressions
            .values()
            .find(|e| e.status() == ExpressionStatus::HasReadyTasks)
            .cloned()
    }

    /// Dispatch the next ready task from any expression.
    pub fn next_task(&self, now: Instant) -> Option<DispatchedTask> {
        let ready: Vec<Arc<Expression>> = self
            .read()
            .expressions
            .values()
            .filter(|e| e.status() == ExpressionStatus::HasReadyTasks)
            .cloned()
            .collect();

        ready.iter().find_map(|e| e.dispatch_next(now))
    }

    /// Route a task result to its owning expression.
    pub fn submit_result(
        &self,
        task_id: TaskId,
        value: f64,
        observed_at: Instant,
    ) -> Result<TaskOutcome> {
        let expression = self
            .get(task_id.expression())
            .ok_or(TaskError::NotFound(task_id))?;
        expression.complete_task(task_id, value, observed_at)
    }
}
