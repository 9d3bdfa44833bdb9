//! Plans written as TOML.
//!
//! ```toml
//! [[steps]]
//! kind = "deploy"
//! name = "token"
//! artifact = "MyToken"
//!
//! [[steps]]
//! kind = "block"
//! name = "snapshot"
//!
//! [[steps]]
//! kind = "deploy"
//! name = "ballot"
//! artifact = "TokenizedBallot"
//! args = [["Cats", "Dogs"], "$token", "$snapshot"]
//! ```
//!
//! String arguments starting with `$` reference an earlier step, `@` a named
//! account. Everything else is coerced to the parameter type at run time.

use std::path::Path;

use alloy::primitives::Address;
use serde::Deserialize;
use thiserror::Error;

use crate::orchestrator::plan::{Arg, DeploymentPlan, Step};

#[derive(Debug, Error)]
pub enum PlanFileError {
    #[error("failed to read plan {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("step '{step}': invalid address '{value}'")]
    InvalidAddress { step: String, value: String },
}

#[derive(Debug, Deserialize)]
struct PlanDocument {
    #[serde(default)]
    steps: Vec<StepSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StepSpec {
    Deploy {
        name: String,
        artifact: String,
        #[serde(default)]
        args: Vec<ArgSpec>,
        from: Option<String>,
    },
    Block {
        name: String,
    },
    Attach {
        name: String,
        artifact: String,
        address: String,
    },
    Write {
        name: String,
        target: String,
        function: String,
        #[serde(default)]
        args: Vec<ArgSpec>,
        from: Option<String>,
    },
    Read {
        name: String,
        target: String,
        function: String,
        #[serde(default)]
        args: Vec<ArgSpec>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ArgSpec {
    Bool(bool),
    Integer(i64),
    Text(String),
    List(Vec<ArgSpec>),
}

impl From<ArgSpec> for Arg {
    fn from(spec: ArgSpec) -> Self {
        match spec {
            ArgSpec::Bool(b) => Arg::Literal(b.to_string()),
            ArgSpec::Integer(i) => Arg::Literal(i.to_string()),
            ArgSpec::Text(text) => Arg::parse(&text),
            ArgSpec::List(items) => Arg::List(items.into_iter().map(Arg::from).collect()),
        }
    }
}

fn convert_args(specs: Vec<ArgSpec>) -> Vec<Arg> {
    specs.into_iter().map(Arg::from).collect()
}

/// Parse a plan from TOML text.
pub fn parse_plan(text: &str) -> Result<DeploymentPlan, PlanFileError> {
    let document: PlanDocument = toml::from_str(text)?;
    let mut plan = DeploymentPlan::new();

    for spec in document.steps {
        let step = match spec {
            StepSpec::Deploy {
                name,
                artifact,
                args,
                from,
            } => with_sender(Step::deploy(&name, &artifact, convert_args(args)), from),
            StepSpec::Block { name } => Step::capture_block(&name),
            StepSpec::Attach {
                name,
                artifact,
                address,
            } => {
                let parsed: Address = address
                    .parse()
                    .map_err(|_| PlanFileError::InvalidAddress {
                        step: name.clone(),
                        value: address.clone(),
                    })?;
                Step::attach(&name, &artifact, parsed)
            }
            StepSpec::Write {
                name,
                target,
                function,
                args,
                from,
            } => with_sender(
                Step::write(&name, &target, &function, convert_args(args)),
                from,
            ),
            StepSpec::Read {
                name,
                target,
                function,
                args,
            } => Step::read(&name, &target, &function, convert_args(args)),
        };
        plan.push(step);
    }

    Ok(plan)
}

fn with_sender(step: Step, from: Option<String>) -> Step {
    match from {
        Some(account) => step.from_account(&account),
        None => step,
    }
}

/// Read and parse a plan file.
pub fn load_plan(path: &Path) -> Result<DeploymentPlan, PlanFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| PlanFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_plan(&text)
}
