use calcgrid_core::Operator;
use calcgrid_core::protocol::TaskPayload;

use crate::error::AgentError;

/// Evaluate one task. Division by zero is refused rather than reported as
/// an infinite result.
pub fn compute(task: &TaskPayload) -> Result<f64, AgentError> {
    if task.operation == Operator::Div && task.arg2 == 0.0 {
        return Err(AgentError::DivisionByZero(task.id));
    }
    Ok(task.operation.apply(task.arg1, task.arg2))
}
