//! # calcgrid Core
//!
//! Domain model of the calcgrid task coordinator: arithmetic expressions are
//! compiled to postfix, decomposed into a graph of binary tasks, and handed
//! out one task at a time to polling agents whose results are backfilled
//! until the expression's value is known.
//!
//! This crate has no I/O. The HTTP layer lives in `calcgrid-gateway` and the
//! agent in `calcgrid-worker`.

pub mod compiler;
pub mod error;
pub mod expression;
pub mod graph;
pub mod pairing;
pub mod protocol;
pub mod registry;
pub mod task;
pub mod tracker;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for ergonomics
pub use compiler::{Postfix, Token};
pub use error::{CompileError, Error, Result, TaskError};
pub use expression::{DispatchedTask, Expression, ExpressionSnapshot, ExpressionStatus, TaskOutcome};
pub use graph::{Candidate, TaskGraph};
pub use registry::ExpressionRegistry;
pub use task::{ExpressionId, Operand, OperationLimits, Operator, Side, Task, TaskId, TaskStatus};
pub use tracker::{SentTask, SentTasks};
