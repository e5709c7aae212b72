//! Task domain types.
//!
//! A task is one binary operation inside an expression's decomposition.
//! Operands are either literal values known at parse time or the pending
//! result of an earlier task in the same expression.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TaskError;
use crate::pairing;

/// Identifier of an expression within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionId(pub u32);

impl std::fmt::Display for ExpressionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Flat task identifier, the pairing of expression ID and operation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    pub fn new(expression: ExpressionId, operation: u32) -> Self {
        Self(pairing::encode(expression.0, operation))
    }

    /// Recover the owning expression and the operation index.
    pub fn split(self) -> (ExpressionId, u32) {
        let (expression, operation) = pairing::decode(self.0);
        (ExpressionId(expression), operation)
    }

    pub fn expression(self) -> ExpressionId {
        self.split().0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the four supported binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
}

impl Operator {
    pub const ALL: [Operator; 4] = [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '+' => Some(Self::Add),
            '-' => Some(Self::Sub),
            '*' => Some(Self::Mul),
            '/' => Some(Self::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    /// Binding strength used by the shunting-yard translation.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Add | Self::Sub => 1,
            Self::Mul | Self::Div => 2,
        }
    }

    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Self::Add => left + right,
            Self::Sub => left - right,
            Self::Mul => left * right,
            Self::Div => left / right,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Maximum execution time allowed per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationLimits {
    pub addition: Duration,
    pub subtraction: Duration,
    pub multiplication: Duration,
    pub division: Duration,
}

impl OperationLimits {
    /// The same limit for every operator.
    pub fn uniform(limit: Duration) -> Self {
        Self {
            addition: limit,
            subtraction: limit,
            multiplication: limit,
            division: limit,
        }
    }

    pub fn for_operator(&self, operator: Operator) -> Duration {
        match operator {
            Operator::Add => self.addition,
            Operator::Sub => self.subtraction,
            Operator::Mul => self.multiplication,
            Operator::Div => self.division,
        }
    }
}

/// An operand slot: a known value, or the result of another task still
/// to be backfilled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Value(f64),
    Awaiting(TaskId),
}

impl Operand {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::Awaiting(_) => None,
        }
    }

    pub fn is_filled(self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Awaiting(id) => write!(f, "<#{id}>"),
        }
    }
}

/// Which operand slot of a task a value belongs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Both operands are present and the task has not been handed out.
    ReadyToCalc,
    /// At least one operand still awaits another task's result.
    WaitingOtherTasks,
    /// Handed to an agent, result not yet confirmed.
    Sent,
    /// Result written. Terminal.
    Calculated,
}

/// A single binary operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    /// Position within the owning expression, in postfix encounter order.
    pub index: u32,
    pub left: Operand,
    pub right: Operand,
    pub operator: Operator,
    pub max_duration: Duration,
    pub result: Option<f64>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(
        id: TaskId,
        index: u32,
        left: Operand,
        right: Operand,
        operator: Operator,
        max_duration: Duration,
    ) -> Self {
        let status = if left.is_filled() && right.is_filled() {
            TaskStatus::ReadyToCalc
        } else {
            TaskStatus::WaitingOtherTasks
        };
        Self {
            id,
            index,
            left,
            right,
            operator,
            max_duration,
            result: None,
            status,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == TaskStatus::ReadyToCalc
    }

    /// Both operand values, if neither slot is still awaiting a result.
    pub fn operands(&self) -> Option<(f64, f64)> {
        Some((self.left.value()?, self.right.value()?))
    }

    /// Change status unless the task is already `Calculated`.
    pub fn set_status(&mut self, status: TaskStatus) {
        if self.status != TaskStatus::Calculated {
            self.status = status;
        }
    }

    /// Write the computed result. A second write is rejected and leaves the
    /// task untouched.
    pub fn write_result(&mut self, value: f64) -> Result<(), TaskError> {
        if self.status == TaskStatus::Calculated {
            return Err(TaskError::AlreadyCalculated(self.id));
        }
        self.result = Some(value);
        self.status = TaskStatus::Calculated;
        Ok(())
    }

    /// Fill the slot on `side` if it is waiting for `from`. Returns whether
    /// the slot was filled. A task that ends up with both slots filled
    /// becomes ready.
    pub fn backfill(&mut self, side: Side, from: TaskId, value: f64) -> bool {
        let slot = match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        };
        if *slot != Operand::Awaiting(from) {
            return false;
        }
        *slot = Operand::Value(value);
        if self.status == TaskStatus::WaitingOtherTasks && self.operands().is_some() {
            self.status = TaskStatus::ReadyToCalc;
        }
        true
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.left, self.operator, self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(left: Operand, right: Operand) -> Task {
        Task::new(
            TaskId::new(ExpressionId(0), 1),
            1,
            left,
            right,
            Operator::Sub,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn task_id_splits_back() {
        let id = TaskId::new(ExpressionId(7), 3);
        assert_eq!(id.split(), (ExpressionId(7), 3));
        assert_eq!(id.expression(), ExpressionId(7));
    }

    #[test]
    fn operator_symbols_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol('%'), None);
    }

    #[test]
    fn operator_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&Operator::Mul).unwrap(), "\"*\"");
        let op: Operator = serde_json::from_str("\"/\"").unwrap();
        assert_eq!(op, Operator::Div);
    }

    #[test]
    fn new_task_status_follows_operands() {
        let ready = task(Operand::Value(1.0), Operand::Value(2.0));
        assert_eq!(ready.status, TaskStatus::ReadyToCalc);

        let waiting = task(Operand::Awaiting(TaskId(0)), Operand::Value(2.0));
        assert_eq!(waiting.status, TaskStatus::WaitingOtherTasks);
        assert_eq!(waiting.operands(), None);
    }

    #[test]
    fn backfill_fills_matching_slot_only() {
        let mut t = task(Operand::Awaiting(TaskId(0)), Operand::Awaiting(TaskId(2)));
        assert!(!t.backfill(Side::Left, TaskId(2), 5.0));
        assert!(t.backfill(Side::Left, TaskId(0), 8.0));
        assert_eq!(t.status, TaskStatus::WaitingOtherTasks);
        assert!(t.backfill(Side::Right, TaskId(2), 3.0));
        assert_eq!(t.status, TaskStatus::ReadyToCalc);
        assert_eq!(t.operands(), Some((8.0, 3.0)));
    }

    #[test]
    fn second_result_write_is_rejected() {
        let mut t = task(Operand::Value(4.0), Operand::Value(1.0));
        t.write_result(3.0).unwrap();
        let err = t.write_result(9.0).unwrap_err();
        assert!(matches!(err, TaskError::AlreadyCalculated(_)));
        assert_eq!(t.result, Some(3.0));
    }

    #[test]
    fn calculated_status_is_absorbing() {
        let mut t = task(Operand::Value(4.0), Operand::Value(1.0));
        t.write_result(3.0).unwrap();
        t.set_status(TaskStatus::Sent);
        assert_eq!(t.status, TaskStatus::Calculated);
    }

    #[test]
    fn uniform_limits() {
        let limits = OperationLimits::uniform(Duration::from_millis(50));
        for op in Operator::ALL {
            assert_eq!(limits.for_operator(op), Duration::from_millis(50));
        }
    }
}
