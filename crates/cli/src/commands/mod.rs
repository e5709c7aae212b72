pub mod agent;
pub mod check;
pub mod config_cmd;
pub mod orchestrator;
