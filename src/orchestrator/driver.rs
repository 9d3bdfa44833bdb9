//! Plan execution.
//!
//! # Responsibilities
//! - Validate the whole plan before sending anything
//! - Run steps strictly in order, one transaction in flight at a time
//! - Bind each step's result so later steps can reference it
//! - Stop at the first failure and report what was done

use std::sync::Arc;

use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::{Function, Param};
use alloy::primitives::Address;
use tracing::Instrument;
use uuid::Uuid;

use crate::artifacts::{Artifact, ArtifactSource};
use crate::blockchain::wallet::AccountBook;
use crate::blockchain::BlockchainError;
use crate::observability::metrics;
use crate::orchestrator::chain::ChainClient;
use crate::orchestrator::env::{Binding, Environment};
use crate::orchestrator::error::{OrchestratorError, PlanFailure};
use crate::orchestrator::plan::{Arg, DeploymentPlan, InvokeMode, Step};
use crate::orchestrator::report::{ExecutionReport, InvokeOutcome, StepOutcome, StepRecord, StepResult};
use crate::orchestrator::state::StepState;

/// Drives deployment plans against a [`ChainClient`].
///
/// The environment persists across [`run`](Self::run) calls, so a second plan
/// can reference contracts deployed by the first.
pub struct Orchestrator<C> {
    client: C,
    artifacts: Arc<dyn ArtifactSource>,
    accounts: AccountBook,
    env: Environment,
}

impl<C: ChainClient> Orchestrator<C> {
    pub fn new(client: C, artifacts: Arc<dyn ArtifactSource>, accounts: AccountBook) -> Self {
        Self {
            client,
            artifacts,
            accounts,
            env: Environment::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resolve one argument against the current bindings.
    pub fn resolve_arg(&self, arg: &Arg, ty: &DynSolType) -> Result<DynSolValue, OrchestratorError> {
        self.env.resolve_arg(arg, ty, &self.accounts)
    }

    /// Deploy a contract and wait for its receipt.
    pub async fn deploy(
        &self,
        artifact: &Artifact,
        args: &[DynSolValue],
        from: Address,
    ) -> Result<StepResult, OrchestratorError> {
        let mut record = StepRecord::new(&artifact.name, "deploy", artifact.name.clone());
        let (_, result) = self.deploy_tracked(artifact, args, from, &mut record).await?;
        Ok(result)
    }

    /// Call `function` on `address`. Writes wait for confirmation; reads
    /// return decoded values without creating a transaction.
    pub async fn invoke(
        &self,
        address: Address,
        function: &Function,
        args: &[DynSolValue],
        mode: InvokeMode,
        from: Address,
    ) -> Result<InvokeOutcome, OrchestratorError> {
        let label = function.signature();
        match mode {
            InvokeMode::Read => self.query(address, function, args, &label).await.map(InvokeOutcome::Values),
            InvokeMode::Write => {
                let mut record = StepRecord::new(&function.name, "write", label.clone());
                self.write_tracked(address, function, args, from, &label, &mut record)
                    .await
                    .map(InvokeOutcome::Transaction)
            }
        }
    }

    /// Current block number.
    pub async fn capture_block(&self) -> Result<u64, OrchestratorError> {
        self.client
            .get_block_number()
            .await
            .map_err(|e| OrchestratorError::Query {
                call: "eth_blockNumber".to_string(),
                source: e,
            })
    }

    /// Execute every step in order.
    ///
    /// Validation problems are reported together and nothing is sent. After
    /// that the first failing step aborts the run; later steps are marked
    /// skipped and the partial report travels with the error.
    pub async fn run(&mut self, plan: &DeploymentPlan) -> Result<ExecutionReport, PlanFailure> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("plan", run_id = %run_id, steps = plan.len());
        self.run_inner(run_id, plan).instrument(span).await
    }

    async fn run_inner(&mut self, run_id: Uuid, plan: &DeploymentPlan) -> Result<ExecutionReport, PlanFailure> {
        let mut report = ExecutionReport::for_plan(run_id, plan);

        if let Err(issues) = plan.validate(self.artifacts.as_ref(), &self.accounts, &self.env) {
            for issue in &issues {
                tracing::error!(issue = %issue, "Plan rejected");
            }
            skip_from(&mut report, 0);
            return Err(PlanFailure {
                step: None,
                error: OrchestratorError::InvalidPlan(issues),
                report,
            });
        }

        for (index, step) in plan.steps().iter().enumerate() {
            let record = &mut report.records[index];
            match self.execute(step, record).await {
                Ok(()) => {
                    metrics::record_step(step.kind(), "confirmed");
                }
                Err(error) => {
                    tracing::error!(step = step.name(), kind = step.kind(), error = %error, "Step failed");
                    metrics::record_step(step.kind(), error.kind());
                    record.error = Some(error.to_string());
                    if let Err(e) = record.advance(StepState::Failed) {
                        tracing::warn!(step = step.name(), error = %e, "Could not mark step failed");
                    }
                    skip_from(&mut report, index + 1);
                    return Err(PlanFailure {
                        step: Some(step.name().to_string()),
                        error,
                        report,
                    });
                }
            }
        }

        tracing::info!(confirmed = report.records.len(), "Plan complete");
        Ok(report)
    }

    async fn execute(&mut self, step: &Step, record: &mut StepRecord) -> Result<(), OrchestratorError> {
        match step {
            Step::Deploy {
                name,
                artifact,
                args,
                from,
            } => {
                let artifact = self.load_artifact(artifact)?;
                let values = self.resolve_all(args, artifact.constructor_inputs())?;
                let from = self.sender(from.as_deref())?;
                let (address, result) = self.deploy_tracked(&artifact, &values, from, record).await?;
                self.env.bind(name, Binding::Contract { address, artifact })?;
                record.outcome = Some(StepOutcome::Deployed(result));
            }
            Step::CaptureBlock { name } => {
                let number = self.capture_block().await?;
                tracing::info!(step = %name, block = number, "Captured block number");
                self.env.bind(name, Binding::Block(number))?;
                record.advance(StepState::Confirmed)?;
                record.outcome = Some(StepOutcome::Block(number));
            }
            Step::Attach {
                name,
                artifact,
                address,
            } => {
                let artifact = self.load_artifact(artifact)?;
                tracing::info!(step = %name, artifact = %artifact.name, address = %address, "Attached existing contract");
                self.env.bind(
                    name,
                    Binding::Contract {
                        address: *address,
                        artifact,
                    },
                )?;
                record.advance(StepState::Confirmed)?;
                record.outcome = Some(StepOutcome::Attached(*address));
            }
            Step::Invoke {
                name,
                target,
                function,
                args,
                mode,
                from,
            } => {
                let (address, artifact) = self.env.contract(target)?;
                let function = artifact
                    .function(function, args.len())
                    .map_err(|e| OrchestratorError::Abi(e.to_string()))?;
                let values = self.resolve_all(args, &function.inputs)?;
                let label = format!("{}.{}", target, function.name);

                match mode {
                    InvokeMode::Read => {
                        let outputs = self.query(address, function, &values, &label).await?;
                        let bound = match outputs.as_slice() {
                            [single] => single.clone(),
                            _ => DynSolValue::Tuple(outputs.clone()),
                        };
                        self.env.bind(name, Binding::Output(bound))?;
                        record.advance(StepState::Confirmed)?;
                        record.outcome = Some(StepOutcome::Values(outputs));
                    }
                    InvokeMode::Write => {
                        let from = self.sender(from.as_deref())?;
                        let result = self
                            .write_tracked(address, function, &values, from, &label, record)
                            .await?;
                        record.outcome = Some(StepOutcome::Transaction(result));
                    }
                }
            }
        }
        Ok(())
    }

    async fn deploy_tracked(
        &self,
        artifact: &Artifact,
        args: &[DynSolValue],
        from: Address,
        record: &mut StepRecord,
    ) -> Result<(Address, StepResult), OrchestratorError> {
        let deployment_error = |reason: String| OrchestratorError::Deployment {
            artifact: artifact.name.clone(),
            reason,
        };

        tracing::info!(from = %from, "Deploying {} contract", artifact.name);
        let tx_hash = self
            .client
            .deploy_contract(from, artifact, args)
            .await
            .map_err(|e| deployment_error(e.to_string()))?;
        record.tx_hash = Some(tx_hash);
        record.advance(StepState::Submitted)?;
        tracing::info!(tx_hash = %tx_hash, "Transaction hash for {} deployment", artifact.name);
        tracing::info!("Waiting for {} contract deployment to be confirmed...", artifact.name);

        let receipt = self
            .client
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| confirmation_error(e, deployment_error))?;
        if !receipt.success {
            return Err(deployment_error(format!("transaction {} reverted", tx_hash)));
        }
        let address = receipt
            .contract_address
            .ok_or_else(|| deployment_error("receipt has no contract address".to_string()))?;
        record.advance(StepState::Confirmed)?;
        tracing::info!(
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "{} contract deployed to {}",
            artifact.name,
            address
        );

        let result = StepResult {
            tx_hash,
            contract_address: Some(address),
            receipt,
        };
        Ok((address, result))
    }

    async fn write_tracked(
        &self,
        address: Address,
        function: &Function,
        args: &[DynSolValue],
        from: Address,
        label: &str,
        record: &mut StepRecord,
    ) -> Result<StepResult, OrchestratorError> {
        let submission_error = |source: BlockchainError| OrchestratorError::Submission {
            call: label.to_string(),
            source,
        };

        tracing::info!(from = %from, to = %address, "Sending {}", label);
        let tx_hash = self
            .client
            .send_transaction(from, address, function, args)
            .await
            .map_err(submission_error)?;
        record.tx_hash = Some(tx_hash);
        record.advance(StepState::Submitted)?;
        tracing::info!(tx_hash = %tx_hash, "Transaction hash for {}", label);

        let receipt = self
            .client
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| match e {
                BlockchainError::ConfirmationTimeout { tx_hash, waited_secs } => {
                    OrchestratorError::ConfirmationTimeout { tx_hash, waited_secs }
                }
                other => submission_error(other),
            })?;
        if !receipt.success {
            return Err(submission_error(BlockchainError::Reverted(format!(
                "transaction {} reverted in block {}",
                tx_hash,
                receipt.block_number.map_or_else(|| "?".to_string(), |b| b.to_string())
            ))));
        }
        record.advance(StepState::Confirmed)?;
        tracing::info!(tx_hash = %tx_hash, block = ?receipt.block_number, "{} confirmed", label);

        Ok(StepResult {
            tx_hash,
            contract_address: None,
            receipt,
        })
    }

    async fn query(
        &self,
        address: Address,
        function: &Function,
        args: &[DynSolValue],
        label: &str,
    ) -> Result<Vec<DynSolValue>, OrchestratorError> {
        let values = self
            .client
            .call(address, function, args)
            .await
            .map_err(|source| OrchestratorError::Query {
                call: label.to_string(),
                source,
            })?;
        tracing::debug!(call = label, outputs = values.len(), "Read completed");
        Ok(values)
    }

    fn load_artifact(&self, name: &str) -> Result<Arc<Artifact>, OrchestratorError> {
        self.artifacts
            .load(name)
            .map_err(|e| OrchestratorError::Configuration(e.to_string()))
    }

    fn sender(&self, name: Option<&str>) -> Result<Address, OrchestratorError> {
        self.accounts.sender(name).ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "no signer for account '{}'",
                name.unwrap_or_default()
            ))
        })
    }

    fn resolve_all(&self, args: &[Arg], params: &[Param]) -> Result<Vec<DynSolValue>, OrchestratorError> {
        if args.len() != params.len() {
            return Err(OrchestratorError::Abi(format!(
                "expected {} argument(s), got {}",
                params.len(),
                args.len()
            )));
        }
        args.iter()
            .zip(params)
            .map(|(arg, param)| {
                let ty = param
                    .resolve()
                    .map_err(|e| OrchestratorError::Abi(format!("parameter '{}': {}", param.name, e)))?;
                self.resolve_arg(arg, &ty)
            })
            .collect()
    }
}

fn confirmation_error(
    error: BlockchainError,
    otherwise: impl FnOnce(String) -> OrchestratorError,
) -> OrchestratorError {
    match error {
        BlockchainError::ConfirmationTimeout { tx_hash, waited_secs } => {
            OrchestratorError::ConfirmationTimeout { tx_hash, waited_secs }
        }
        other => otherwise(other.to_string()),
    }
}

fn skip_from(report: &mut ExecutionReport, start: usize) {
    for record in report.records.iter_mut().skip(start) {
        if record.state == StepState::Pending {
            record.state = StepState::Skipped;
        }
    }
}
