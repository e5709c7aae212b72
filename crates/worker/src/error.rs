use calcgrid_core::TaskId;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Orchestrator refused result for task {id}: HTTP {status}")]
    Rejected { id: TaskId, status: u16 },

    #[error("Orchestrator answered task poll with HTTP {0}")]
    UnexpectedStatus(u16),

    #[error("Division by zero in task {0}")]
    DivisionByZero(TaskId),
}
