//! Error types for the calcgrid domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::time::Duration;
use thiserror::Error;

use crate::task::{ExpressionId, Operator, TaskId};

/// The top-level error type for all calcgrid operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Expression compilation ---
    #[error("Malformed expression: {0}")]
    Compile(#[from] CompileError),

    #[error("Expression is empty")]
    EmptyExpression,

    // --- Task lifecycle ---
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the caller can fix this by sending different input.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Error::Compile(_) | Error::EmptyExpression)
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("mismatched parentheses")]
    MismatchedParentheses,

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("{operators} operator(s) for {operands} operand(s)")]
    OperatorCountMismatch { operators: usize, operands: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("Task {0} does not exist")]
    NotFound(TaskId),

    #[error(
        "Timeout on task {operation} of expression {expression}: operator '{operator}' \
         allowed {expected:?}, took {actual:?}"
    )]
    Timeout {
        operator: Operator,
        expected: Duration,
        actual: Duration,
        expression: ExpressionId,
        operation: u32,
    },

    #[error("BUG: result for task {0} written more than once")]
    AlreadyCalculated(TaskId),
}
