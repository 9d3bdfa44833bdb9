//! Command execution: build the plan, connect, run, print the report.

use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::artifacts::{ArtifactDirectory, ArtifactSource};
use crate::blockchain::{AccountBook, BlockchainClient, Keyring};
use crate::cli::{CliError, Commands};
use crate::config::{Credentials, DeployerConfig};
use crate::orchestrator::{load_plan, DeploymentPlan, Environment, Orchestrator, OrchestratorError};
use crate::workflows::{ballot, token, Contracts};

/// Run one command to completion.
pub async fn execute(command: Commands, config: &DeployerConfig) -> Result<(), CliError> {
    let artifacts: Arc<dyn ArtifactSource> = Arc::new(ArtifactDirectory::new(&config.artifacts.dir));
    let check_only = matches!(command, Commands::Check { .. });
    let plan = build_plan(command, &Contracts::from(&config.artifacts), config)?;

    if check_only {
        plan.validate(artifacts.as_ref(), &configured_accounts(config), &Environment::new())
            .map_err(OrchestratorError::InvalidPlan)?;
        println!("plan OK: {} step(s)", plan.len());
        return Ok(());
    }

    let credentials = Credentials::from_env(config)?;
    let keyring = Keyring::from_keys(&credentials.accounts, config.network.chain_id)?;
    let client = BlockchainClient::new(
        config.network.clone(),
        &credentials.rpc_url,
        keyring.ethereum_wallet(),
    )
    .await?;
    if !client.is_healthy().await {
        tracing::warn!("RPC endpoint is not answering; continuing anyway");
    }
    tracing::info!(
        sender = %keyring.default_wallet().address(),
        accounts = keyring.wallets().len(),
        "Signers loaded"
    );

    let mut orchestrator = Orchestrator::new(client, artifacts, keyring.address_book());
    match orchestrator.run(&plan).await {
        Ok(report) => {
            print!("{}", report);
            Ok(())
        }
        Err(failure) => {
            eprint!("{}", failure.report);
            Err(failure.into())
        }
    }
}

fn build_plan(
    command: Commands,
    contracts: &Contracts,
    config: &DeployerConfig,
) -> Result<DeploymentPlan, CliError> {
    let plan = match command {
        Commands::Deploy { proposals } => ballot::deploy_plan(contracts, &proposals)?,
        Commands::Demo {
            proposals,
            voters,
            amount,
        } => {
            let amount = U256::from_str(&amount)
                .map_err(|e| CliError::Usage(format!("amount '{}': {}", amount, e)))?;
            ballot::demo_plan(contracts, &proposals, &voters, amount)?
        }
        Commands::Mint { token, to, amount } => token::mint_plan(contracts, token, to, &amount),
        Commands::Transfer {
            token,
            to,
            amount,
            from,
        } => token::transfer_plan(contracts, token, to, &amount, from.as_deref()),
        Commands::Delegate { token, to, from } => {
            let signer = from.unwrap_or_else(|| config.accounts.deployer_name.clone());
            token::delegate_plan(contracts, token, to, &signer)
        }
        Commands::Vote {
            ballot,
            proposal,
            amount,
            from,
        } => ballot::vote_plan(contracts, ballot, proposal, &amount, from.as_deref()),
        Commands::Results { ballot, proposals } => ballot::results_plan(contracts, ballot, proposals),
        Commands::Run { plan } | Commands::Check { plan } => load_plan(&plan)?,
    };
    Ok(plan)
}

/// Account names from the config with placeholder addresses; enough to
/// validate a plan without any keys.
fn configured_accounts(config: &DeployerConfig) -> AccountBook {
    config
        .accounts
        .extra
        .keys()
        .fold(
            AccountBook::new(&config.accounts.deployer_name, Address::ZERO),
            |book, name| book.with(name, Address::ZERO),
        )
}
