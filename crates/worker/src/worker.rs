//! The agent's three cooperating loops.
//!
//! ```text
//! poller ──tasks──▶ compute × N ──results──▶ sender
//! ```
//!
//! Both channels are bounded by the computing power, so the poller stops
//! fetching while every compute loop is busy.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use calcgrid_config::AgentConfig;
use calcgrid_core::protocol::{TaskPayload, TaskResultRequest};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::compute::compute;
use crate::coordinator::{Coordinator, HttpCoordinator};
use crate::error::AgentError;

pub struct Worker<C> {
    coordinator: Arc<C>,
    computing_power: usize,
    poll_interval: Duration,
}

impl Worker<HttpCoordinator> {
    /// A worker talking HTTP to the orchestrator named in the config.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let coordinator = HttpCoordinator::new(config.server_url.clone())?;
        Ok(Self::new(
            Arc::new(coordinator),
            config.computing_power,
            config.poll_interval(),
        ))
    }
}

impl<C: Coordinator + 'static> Worker<C> {
    pub fn new(coordinator: Arc<C>, computing_power: usize, poll_interval: Duration) -> Self {
        Self {
            coordinator,
            computing_power: computing_power.max(1),
            poll_interval,
        }
    }

    pub fn computing_power(&self) -> usize {
        self.computing_power
    }

    /// Run until `shutdown` resolves. Errors are logged and never stop the
    /// loops.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let capacity = self.computing_power;
        let (task_tx, task_rx) = mpsc::channel::<TaskPayload>(capacity);
        let (result_tx, result_rx) = mpsc::channel::<TaskResultRequest>(capacity);
        let task_rx = Arc::new(Mutex::new(task_rx));

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(capacity + 2);
        handles.push(tokio::spawn(poll_loop(
            Arc::clone(&self.coordinator),
            self.poll_interval,
            task_tx,
        )));
        for worker in 0..capacity {
            handles.push(tokio::spawn(compute_loop(
                worker,
                Arc::clone(&task_rx),
                result_tx.clone(),
            )));
        }
        drop(result_tx);
        handles.push(tokio::spawn(send_loop(
            Arc::clone(&self.coordinator),
            result_rx,
        )));

        info!(
            computing_power = capacity,
            poll_interval = ?self.poll_interval,
            "Agent running"
        );

        shutdown.await;
        for handle in &handles {
            handle.abort();
        }
        info!("Agent stopped");
    }
}

/// Fetch tasks. After receiving one, poll again right away; otherwise wait
/// one interval.
async fn poll_loop<C: Coordinator>(
    coordinator: Arc<C>,
    interval: Duration,
    tasks: mpsc::Sender<TaskPayload>,
) {
    loop {
        match coordinator.fetch_task().await {
            Ok(Some(task)) => {
                debug!(task = %task.id, operation = %task.operation, "Fetched task");
                if tasks.send(task).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Failed to fetch task"),
        }
        tokio::time::sleep(interval).await;
    }
}

async fn compute_loop(
    worker: usize,
    tasks: Arc<Mutex<mpsc::Receiver<TaskPayload>>>,
    results: mpsc::Sender<TaskResultRequest>,
) {
    loop {
        let next = tasks.lock().await.recv().await;
        let Some(task) = next else {
            break;
        };
        match compute(&task) {
            Ok(result) => {
                let sent = results
                    .send(TaskResultRequest {
                        id: task.id,
                        result,
                    })
                    .await;
                if sent.is_err() {
                    break;
                }
            }
            Err(e) => warn!(worker, task = %task.id, error = %e, "Task not computed"),
        }
    }
}

async fn send_loop<C: Coordinator>(
    coordinator: Arc<C>,
    mut results: mpsc::Receiver<TaskResultRequest>,
) {
    while let Some(result) = results.recv().await {
        match coordinator.submit_result(&result).await {
            Ok(()) => debug!(task = %result.id, result = result.result, "Result delivered"),
            Err(e) => warn!(task = %result.id, error = %e, "Failed to deliver result"),
        }
    }
}
