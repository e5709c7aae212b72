//! calcgrid worker agent.
//!
//! Polls the orchestrator for tasks, evaluates them on a pool of compute
//! loops, and posts the results back. One agent process corresponds to one
//! [`Worker`]; its parallelism is the configured computing power.

pub mod compute;
pub mod coordinator;
pub mod error;
pub mod worker;

pub use compute::compute;
pub use coordinator::{Coordinator, HttpCoordinator};
pub use error::AgentError;
pub use worker::Worker;
