//! Deployment orchestration for a voting token and tokenized ballot.

pub mod artifacts;
pub mod blockchain;
pub mod cli;
pub mod config;
pub mod observability;
pub mod orchestrator;
pub mod resilience;
pub mod workflows;

pub use config::schema::DeployerConfig;
pub use orchestrator::{DeploymentPlan, Orchestrator};
