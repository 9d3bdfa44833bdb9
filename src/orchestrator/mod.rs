//! Deployment orchestration.
//!
//! # Data Flow
//! ```text
//! DeploymentPlan (built in code, or plan_file.rs from TOML)
//!     → plan.rs (static validation: names, ordering, accounts, artifacts)
//!     → driver.rs (sequential execution against a ChainClient)
//!         → env.rs (append-only bindings, reference resolution)
//!         → state.rs (Pending → Submitted → Confirmed | Failed | Skipped)
//!     → report.rs (ExecutionReport, or PlanFailure with the partial report)
//! ```

pub mod chain;
pub mod driver;
pub mod encoding;
pub mod env;
pub mod error;
pub mod plan;
pub mod plan_file;
pub mod report;
pub mod state;

pub use chain::ChainClient;
pub use driver::Orchestrator;
pub use env::{Binding, Environment};
pub use error::{OrchestratorError, PlanFailure};
pub use plan::{Arg, DeploymentPlan, InvokeMode, PlanIssue, Reference, Step};
pub use plan_file::{load_plan, parse_plan, PlanFileError};
pub use report::{ExecutionReport, InvokeOutcome, StepOutcome, StepRecord, StepResult};
pub use state::StepState;
