//! ballot-deployer
//!
//! Deploys `MyToken` and `TokenizedBallot` and drives them through the
//! voting lifecycle.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv ──▶ cli ──▶ workflows / plan_file ──▶ DeploymentPlan
//!                                                   │
//!                                                   ▼
//!   config + .env ──▶ credentials ──▶ Keyring   orchestrator ──▶ ExecutionReport
//!                                       │           │
//!                                       ▼           ▼
//!                              BlockchainClient (ChainClient) ──▶ JSON-RPC node
//! ```

use std::process::ExitCode;

use clap::Parser;

use ballot_deployer::cli::{self, Cli};
use ballot_deployer::observability::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; variables may come from the shell
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        chain_id = config.network.chain_id,
        artifacts = %config.artifacts.dir,
        "ballot-deployer starting"
    );

    match cli::execute(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
