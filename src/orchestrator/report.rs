//! What a plan run did, step by step.

use std::fmt;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, TxHash};
use uuid::Uuid;

use crate::blockchain::Receipt;
use crate::orchestrator::encoding::display_value;
use crate::orchestrator::plan::DeploymentPlan;
use crate::orchestrator::state::{IllegalTransition, StepState};

/// A confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub tx_hash: TxHash,
    pub receipt: Receipt,
    /// Set for deployments.
    pub contract_address: Option<Address>,
}

/// What [`Orchestrator::invoke`](crate::orchestrator::Orchestrator::invoke) returns.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeOutcome {
    Transaction(StepResult),
    Values(Vec<DynSolValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Deployed(StepResult),
    Transaction(StepResult),
    Values(Vec<DynSolValue>),
    Block(u64),
    Attached(Address),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub name: String,
    pub kind: &'static str,
    pub description: String,
    pub state: StepState,
    pub tx_hash: Option<TxHash>,
    pub outcome: Option<StepOutcome>,
    pub error: Option<String>,
}

impl StepRecord {
    pub fn new(name: &str, kind: &'static str, description: String) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description,
            state: StepState::Pending,
            tx_hash: None,
            outcome: None,
            error: None,
        }
    }

    pub fn advance(&mut self, next: StepState) -> Result<(), IllegalTransition> {
        self.state = self.state.transition(next)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub records: Vec<StepRecord>,
}

impl ExecutionReport {
    /// One pending record per step.
    pub fn for_plan(run_id: Uuid, plan: &DeploymentPlan) -> Self {
        Self {
            run_id,
            records: plan
                .steps()
                .iter()
                .map(|s| StepRecord::new(s.name(), s.kind(), s.describe()))
                .collect(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.records.iter().all(|r| r.state == StepState::Confirmed)
    }

    pub fn record(&self, name: &str) -> Option<&StepRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn count(&self, state: StepState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }

    pub fn address_of(&self, name: &str) -> Option<Address> {
        match self.record(name)?.outcome.as_ref()? {
            StepOutcome::Deployed(result) => result.contract_address,
            StepOutcome::Attached(address) => Some(*address),
            _ => None,
        }
    }

    pub fn values_of(&self, name: &str) -> Option<&[DynSolValue]> {
        match self.record(name)?.outcome.as_ref()? {
            StepOutcome::Values(values) => Some(values),
            _ => None,
        }
    }

    pub fn block_of(&self, name: &str) -> Option<u64> {
        match self.record(name)?.outcome.as_ref()? {
            StepOutcome::Block(number) => Some(*number),
            _ => None,
        }
    }

    /// Every transaction hash in step order.
    pub fn transactions(&self) -> Vec<TxHash> {
        self.records.iter().filter_map(|r| r.tx_hash).collect()
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "run {}: {}/{} steps confirmed",
            self.run_id,
            self.count(StepState::Confirmed),
            self.records.len()
        )?;
        for record in &self.records {
            write!(
                f,
                "  [{:<9}] {:<6} {} ({})",
                record.state, record.kind, record.name, record.description
            )?;
            match &record.outcome {
                Some(StepOutcome::Deployed(result)) => {
                    if let Some(address) = result.contract_address {
                        write!(f, " at {}", address)?;
                    }
                    write!(f, " tx {}", result.tx_hash)?;
                }
                Some(StepOutcome::Transaction(result)) => write!(f, " tx {}", result.tx_hash)?,
                Some(StepOutcome::Values(values)) => {
                    let rendered: Vec<String> = values.iter().map(display_value).collect();
                    write!(f, " = {}", rendered.join(", "))?;
                }
                Some(StepOutcome::Block(number)) => write!(f, " = block {}", number)?,
                Some(StepOutcome::Attached(address)) => write!(f, " at {}", address)?,
                None => {
                    if let Some(tx_hash) = record.tx_hash {
                        write!(f, " tx {}", tx_hash)?;
                    }
                }
            }
            if let Some(error) = &record.error {
                write!(f, ": {}", error)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
