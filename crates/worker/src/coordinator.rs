//! Connection to the orchestrator.

use async_trait::async_trait;
use calcgrid_core::protocol::{TaskEnvelope, TaskPayload, TaskResultRequest};
use reqwest::StatusCode;
use tracing::trace;

use crate::error::AgentError;

/// Where an agent gets work from and reports results to.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// The next ready task, or `None` when nothing is available right now.
    async fn fetch_task(&self) -> Result<Option<TaskPayload>, AgentError>;

    async fn submit_result(&self, result: &TaskResultRequest) -> Result<(), AgentError>;
}

/// The orchestrator's internal HTTP API.
pub struct HttpCoordinator {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCoordinator {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self) -> String {
        format!("{}/internal/task", self.base_url)
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn fetch_task(&self) -> Result<Option<TaskPayload>, AgentError> {
        let response = self.client.get(self.task_url()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let envelope: TaskEnvelope = response.json().await?;
                trace!(task = %envelope.task.id, "Received task");
                Ok(Some(envelope.task))
            }
            status => Err(AgentError::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn submit_result(&self, result: &TaskResultRequest) -> Result<(), AgentError> {
        let response = self
            .client
            .post(self.task_url())
            .json(result)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Rejected {
                id: result.id,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let coordinator = HttpCoordinator::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(coordinator.base_url(), "http://127.0.0.1:8080");
        assert_eq!(coordinator.task_url(), "http://127.0.0.1:8080/internal/task");
    }
}
