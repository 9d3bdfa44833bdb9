//! Plans for the ballot and token scripts.
//!
//! Each function returns a [`DeploymentPlan`](crate::orchestrator::DeploymentPlan);
//! nothing here talks to a chain.

pub mod ballot;
pub mod token;

use crate::config::ArtifactsConfig;
use crate::orchestrator::Step;

/// Artifact names of the two contracts the workflows drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contracts {
    pub token: String,
    pub ballot: String,
}

impl Contracts {
    pub fn new(token: &str, ballot: &str) -> Self {
        Self {
            token: token.to_string(),
            ballot: ballot.to_string(),
        }
    }
}

impl From<&ArtifactsConfig> for Contracts {
    fn from(config: &ArtifactsConfig) -> Self {
        Self::new(&config.token, &config.ballot)
    }
}

impl Default for Contracts {
    fn default() -> Self {
        Self::from(&ArtifactsConfig::default())
    }
}

/// Steps without an explicit sender sign with the deployer.
pub(crate) fn signed_by(step: Step, from: Option<&str>) -> Step {
    match from {
        Some(account) => step.from_account(account),
        None => step,
    }
}
