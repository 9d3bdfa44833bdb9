//! Orchestrator error taxonomy.

use std::fmt;

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::blockchain::BlockchainError;
use crate::orchestrator::plan::{PlanIssue, Reference};
use crate::orchestrator::report::ExecutionReport;
use crate::orchestrator::state::IllegalTransition;

/// Why a step (or the whole plan) could not complete.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Missing credentials, unknown account, unreadable artifact and the like.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A state-changing call was rejected by the node or reverted.
    #[error("transaction {call} failed: {source}")]
    Submission {
        call: String,
        #[source]
        source: BlockchainError,
    },

    /// No receipt arrived inside the confirmation window.
    #[error("transaction {tx_hash} not confirmed after {waited_secs}s")]
    ConfirmationTimeout { tx_hash: TxHash, waited_secs: u64 },

    #[error("unresolved reference {0}")]
    UnresolvedReference(Reference),

    /// Contract creation was rejected, reverted, or produced no address.
    #[error("deployment of {artifact} failed: {reason}")]
    Deployment { artifact: String, reason: String },

    /// A read-only call failed.
    #[error("query {call} failed: {source}")]
    Query {
        call: String,
        #[source]
        source: BlockchainError,
    },

    /// An argument could not be converted to its parameter type.
    #[error("ABI error: {0}")]
    Abi(String),

    /// Static validation failed; nothing was sent.
    #[error("invalid plan: {}", join_issues(.0))]
    InvalidPlan(Vec<PlanIssue>),

    #[error(transparent)]
    State(#[from] IllegalTransition),
}

fn join_issues(issues: &[PlanIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl OrchestratorError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Configuration(_) => "configuration",
            OrchestratorError::Submission { .. } => "submission",
            OrchestratorError::ConfirmationTimeout { .. } => "confirmation_timeout",
            OrchestratorError::UnresolvedReference(_) => "unresolved_reference",
            OrchestratorError::Deployment { .. } => "deployment",
            OrchestratorError::Query { .. } => "query",
            OrchestratorError::Abi(_) => "abi",
            OrchestratorError::InvalidPlan(_) => "invalid_plan",
            OrchestratorError::State(_) => "state",
        }
    }
}

/// A plan that stopped early, with everything recorded up to that point.
#[derive(Debug)]
pub struct PlanFailure {
    /// The step that failed; `None` when validation rejected the plan.
    pub step: Option<String>,
    pub error: OrchestratorError,
    pub report: ExecutionReport,
}

impl fmt::Display for PlanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Some(step) => write!(f, "step '{}' failed: {}", step, self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for PlanFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
