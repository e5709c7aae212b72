//! Task graph — the decomposition of one expression into binary tasks, and
//! the readiness resolver that walks it.
//!
//! Tasks are stored in post-order. Every task except the root feeds exactly
//! one later task, recorded as an explicit `(consumer, side)` edge so a result
//! always lands in the operand slot its sub-expression occupies.

use crate::compiler::Postfix;
use crate::error::{Error, Result, TaskError};
use crate::task::{ExpressionId, Operand, OperationLimits, Side, Task, TaskId, TaskStatus};

/// Outcome of asking the resolver for the next dispatchable task.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// The task at the cursor was ready; it is now `Sent`.
    Ready(Task),
    /// The task at the cursor still waits on an earlier result.
    Waiting,
    /// Every task has been handed out.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct TaskGraph {
    expression: ExpressionId,
    tasks: Vec<Task>,
    consumers: Vec<Option<(usize, Side)>>,
    /// Value of an operator-free expression.
    literal: Option<f64>,
    registered: usize,
    updated: usize,
}

enum Slot {
    Literal(f64),
    Pending(usize),
}

/// Build the task graph for a compiled expression.
///
/// Task `i` gets the ID `encode(expression, i)` and the time limit of its
/// operator. Malformed postfix input is an internal error; the compiler
/// never produces it.
pub fn build(
    expression: ExpressionId,
    postfix: &[Postfix],
    limits: &OperationLimits,
) -> Result<TaskGraph> {
    let mut tasks: Vec<Task> = Vec::new();
    let mut consumers: Vec<Option<(usize, Side)>> = Vec::new();
    let mut stack: Vec<Slot> = Vec::new();

    let underflow = || Error::Internal(format!("operand stack underflow in expression {expression}"));

    for token in postfix {
        match *token {
            Postfix::Number(value) => stack.push(Slot::Literal(value)),
            Postfix::Operator(operator) => {
                let right = stack.pop().ok_or_else(underflow)?;
                let left = stack.pop().ok_or_else(underflow)?;

                let index = tasks.len();
                let operation = u32::try_from(index).map_err(|_| {
                    Error::Internal(format!("expression {expression} has too many operations"))
                })?;

                let mut operand = |slot: Slot, side: Side| match slot {
                    Slot::Literal(v) => Operand::Value(v),
                    Slot::Pending(producer) => {
                        consumers[producer] = Some((index, side));
                        Operand::Awaiting(tasks[producer].id)
                    }
                };
                let left = operand(left, Side::Left);
                let right = operand(right, Side::Right);

                tasks.push(Task::new(
                    TaskId::new(expression, operation),
                    operation,
                    left,
                    right,
                    operator,
                    limits.for_operator(operator),
                ));
                consumers.push(None);
                stack.push(Slot::Pending(index));
            }
        }
    }

    let literal = match (stack.pop(), stack.is_empty()) {
        (Some(Slot::Literal(v)), true) => Some(v),
        (Some(Slot::Pending(_)), true) => None,
        _ => {
            return Err(Error::Internal(format!(
                "expression {expression} does not reduce to a single value"
            )));
        }
    };

    Ok(TaskGraph {
        expression,
        tasks,
        consumers,
        literal,
        registered: 0,
        updated: 0,
    })
}

impl TaskGraph {
    pub fn expression(&self) -> ExpressionId {
        self.expression
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// How many tasks have been handed out.
    pub fn registered(&self) -> usize {
        self.registered
    }

    /// How many results have been written back.
    pub fn updated(&self) -> usize {
        self.updated
    }

    /// Where the result of task `index` is consumed. `None` for the root.
    pub fn consumer(&self, index: usize) -> Option<(usize, Side)> {
        self.consumers.get(index).copied().flatten()
    }

    /// Whether the task at the cursor can be dispatched right now.
    pub fn has_ready(&self) -> bool {
        self.tasks.get(self.registered).is_some_and(Task::is_ready)
    }

    /// Hand out the task at the cursor if it is ready.
    ///
    /// Candidacy is strictly in list order: a waiting task at the cursor
    /// blocks later ready tasks until its inputs arrive.
    pub fn next_candidate(&mut self) -> Candidate {
        match self.tasks.get_mut(self.registered) {
            None => Candidate::Exhausted,
            Some(task) if task.is_ready() => {
                task.set_status(TaskStatus::Sent);
                self.registered += 1;
                Candidate::Ready(task.clone())
            }
            Some(_) => Candidate::Waiting,
        }
    }

    /// Write the result of task `index` and backfill it into its consumer.
    ///
    /// On error nothing is modified.
    pub fn record_result(&mut self, index: usize, value: f64) -> Result<()> {
        let Some(task) = self.tasks.get(index) else {
            return Err(Error::Internal(format!(
                "expression {} has no task at index {index}",
                self.expression
            )));
        };
        if task.status == TaskStatus::Calculated {
            return Err(TaskError::AlreadyCalculated(task.id).into());
        }
        let from = task.id;

        if let Some((consumer, side)) = self.consumer(index) {
            let slot = match side {
                Side::Left => self.tasks[consumer].left,
                Side::Right => self.tasks[consumer].right,
            };
            if slot != Operand::Awaiting(from) {
                return Err(Error::Internal(format!(
                    "task {} is not waiting for task {from}",
                    self.tasks[consumer].id
                )));
            }
            self.tasks[consumer].backfill(side, from, value);
        }

        self.tasks[index].write_result(value)?;
        self.updated += 1;
        Ok(())
    }

    /// The expression's value: the root task's result, or the literal of an
    /// operator-free expression.
    pub fn result(&self) -> Option<f64> {
        match self.tasks.last() {
            Some(root) => root.result,
            None => self.literal,
        }
    }
}
