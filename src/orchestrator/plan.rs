//! Deployment plans: an explicit, ordered list of steps.
//!
//! Steps refer to each other by name. A step may only reference names bound
//! by steps that come before it; [`DeploymentPlan::validate`] checks this (and
//! everything else that can be known without a chain) up front.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::Address;
use thiserror::Error;

use crate::artifacts::{Artifact, ArtifactSource};
use crate::blockchain::wallet::AccountBook;
use crate::orchestrator::env::{Binding, Environment};

/// Symbolic placeholder for a value produced elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Value bound by an earlier step (`$name`).
    Step(String),
    /// Address of a named signer (`@name`).
    Account(String),
}

impl Reference {
    /// Parse `$name` / `@name`. Anything else is not a reference.
    pub fn parse(text: &str) -> Option<Self> {
        if let Some(name) = text.strip_prefix('$') {
            (!name.is_empty()).then(|| Reference::Step(name.to_string()))
        } else if let Some(name) = text.strip_prefix('@') {
            (!name.is_empty()).then(|| Reference::Account(name.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Step(name) => write!(f, "${}", name),
            Reference::Account(name) => write!(f, "@{}", name),
        }
    }
}

/// A step argument before resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Already-typed value.
    Value(DynSolValue),
    /// Text coerced to the parameter type when the step runs.
    Literal(String),
    Ref(Reference),
    /// Elements of an array parameter.
    List(Vec<Arg>),
}

impl Arg {
    /// `$x` and `@x` become references, anything else a literal.
    pub fn parse(text: &str) -> Self {
        match Reference::parse(text) {
            Some(reference) => Arg::Ref(reference),
            None => Arg::Literal(text.to_string()),
        }
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Arg::Literal(text.into())
    }

    pub fn step(name: &str) -> Self {
        Arg::Ref(Reference::Step(name.to_string()))
    }

    pub fn account(name: &str) -> Self {
        Arg::Ref(Reference::Account(name.to_string()))
    }

    /// Every reference inside this argument, depth first.
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Arg::Ref(reference) => vec![reference],
            Arg::List(items) => items.iter().flat_map(Arg::references).collect(),
            Arg::Value(_) | Arg::Literal(_) => Vec::new(),
        }
    }
}

impl From<DynSolValue> for Arg {
    fn from(value: DynSolValue) -> Self {
        Arg::Value(value)
    }
}

/// Whether an invocation changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeMode {
    /// Signed transaction, waits for confirmation.
    Write,
    /// `eth_call`, no transaction.
    Read,
}

/// One unit of work in a plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Deploy `artifact`; binds the contract address under `name`.
    Deploy {
        name: String,
        artifact: String,
        args: Vec<Arg>,
        from: Option<String>,
    },
    /// Read the current block number; binds it under `name`.
    CaptureBlock { name: String },
    /// Bind an existing deployment under `name`.
    Attach {
        name: String,
        artifact: String,
        address: Address,
    },
    /// Call `function` on the contract bound as `target`. Reads bind their
    /// output under `name`; writes bind nothing.
    Invoke {
        name: String,
        target: String,
        function: String,
        args: Vec<Arg>,
        mode: InvokeMode,
        from: Option<String>,
    },
}

impl Step {
    pub fn deploy(name: &str, artifact: &str, args: Vec<Arg>) -> Self {
        Step::Deploy {
            name: name.to_string(),
            artifact: artifact.to_string(),
            args,
            from: None,
        }
    }

    pub fn capture_block(name: &str) -> Self {
        Step::CaptureBlock {
            name: name.to_string(),
        }
    }

    pub fn attach(name: &str, artifact: &str, address: Address) -> Self {
        Step::Attach {
            name: name.to_string(),
            artifact: artifact.to_string(),
            address,
        }
    }

    pub fn write(name: &str, target: &str, function: &str, args: Vec<Arg>) -> Self {
        Step::Invoke {
            name: name.to_string(),
            target: target.to_string(),
            function: function.to_string(),
            args,
            mode: InvokeMode::Write,
            from: None,
        }
    }

    pub fn read(name: &str, target: &str, function: &str, args: Vec<Arg>) -> Self {
        Step::Invoke {
            name: name.to_string(),
            target: target.to_string(),
            function: function.to_string(),
            args,
            mode: InvokeMode::Read,
            from: None,
        }
    }

    /// Sign with the named account instead of the default one.
    /// Has no effect on steps that send nothing.
    pub fn from_account(mut self, account: &str) -> Self {
        match &mut self {
            Step::Deploy { from, .. } => *from = Some(account.to_string()),
            Step::Invoke {
                from,
                mode: InvokeMode::Write,
                ..
            } => *from = Some(account.to_string()),
            _ => {}
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Deploy { name, .. }
            | Step::CaptureBlock { name }
            | Step::Attach { name, .. }
            | Step::Invoke { name, .. } => name,
        }
    }

    /// Short label used in logs, metrics and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Deploy { .. } => "deploy",
            Step::CaptureBlock { .. } => "block",
            Step::Attach { .. } => "attach",
            Step::Invoke {
                mode: InvokeMode::Write,
                ..
            } => "write",
            Step::Invoke {
                mode: InvokeMode::Read,
                ..
            } => "read",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Step::Deploy { artifact, .. } => artifact.clone(),
            Step::CaptureBlock { .. } => "current block".to_string(),
            Step::Attach {
                artifact, address, ..
            } => format!("{} at {}", artifact, address),
            Step::Invoke {
                target, function, ..
            } => format!("{}.{}", target, function),
        }
    }

    pub fn args(&self) -> &[Arg] {
        match self {
            Step::Deploy { args, .. } | Step::Invoke { args, .. } => args,
            Step::CaptureBlock { .. } | Step::Attach { .. } => &[],
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match self {
            Step::Deploy { from, .. } | Step::Invoke { from, .. } => from.as_deref(),
            _ => None,
        }
    }

    /// Whether a later step can reference this step's name.
    pub fn binds_value(&self) -> bool {
        !matches!(
            self,
            Step::Invoke {
                mode: InvokeMode::Write,
                ..
            }
        )
    }
}

/// A problem found before anything touches the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanIssue {
    #[error("plan has no steps")]
    Empty,

    #[error("step {index}: name '{name}' is already used")]
    DuplicateName { index: usize, name: String },

    #[error("step '{step}': {reference} is only produced later in the plan")]
    ForwardReference { step: String, reference: Reference },

    #[error("step '{step}': {reference} does not name any step")]
    UnknownReference { step: String, reference: Reference },

    #[error("step '{step}': {reference} is a write and binds no value")]
    NoValue { step: String, reference: Reference },

    #[error("step '{step}': unknown account '{account}'")]
    UnknownAccount { step: String, account: String },

    #[error("step '{step}': {reason}")]
    Artifact { step: String, reason: String },

    #[error("step '{step}': artifact '{artifact}' has no creation bytecode")]
    NotDeployable { step: String, artifact: String },

    #[error("step '{step}': target '{target}' is not a contract")]
    TargetNotContract { step: String, target: String },

    #[error("step '{step}': constructor takes {expected} argument(s), got {got}")]
    ArgumentCount {
        step: String,
        expected: usize,
        got: usize,
    },
}

/// What validation knows about a name bound before the current step.
enum Known {
    Contract(Arc<Artifact>),
    Value,
    NoValue,
}

/// An ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentPlan {
    steps: Vec<Step>,
}

impl DeploymentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check ordering, names, accounts, artifacts and arity.
    ///
    /// `prior` holds bindings from earlier runs on the same orchestrator;
    /// they count as already resolved. Returns every issue found.
    pub fn validate(
        &self,
        artifacts: &dyn ArtifactSource,
        accounts: &AccountBook,
        prior: &Environment,
    ) -> Result<(), Vec<PlanIssue>> {
        let mut issues = Vec::new();
        if self.steps.is_empty() {
            issues.push(PlanIssue::Empty);
        }

        let mut known: HashMap<&str, Known> = HashMap::new();
        for (name, binding) in prior.iter() {
            let entry = match binding {
                Binding::Contract { artifact, .. } => Known::Contract(artifact.clone()),
                _ => Known::Value,
            };
            known.insert(name, entry);
        }
        let later_names: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name(), i))
            .collect();

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.name();

            if let Some(account) = step.sender() {
                if !accounts.contains(account) {
                    issues.push(PlanIssue::UnknownAccount {
                        step: name.to_string(),
                        account: account.to_string(),
                    });
                }
            }

            for reference in step.args().iter().flat_map(Arg::references) {
                check_reference(name, reference, &known, &later_names, accounts, &mut issues);
            }

            let bound = match step {
                Step::Deploy { artifact, args, .. } => {
                    match load_for(name, artifacts, artifact, &mut issues) {
                        Some(artifact) => {
                            if !artifact.is_deployable() {
                                issues.push(PlanIssue::NotDeployable {
                                    step: name.to_string(),
                                    artifact: artifact.name.clone(),
                                });
                            }
                            let expected = artifact.constructor_inputs().len();
                            if expected != args.len() {
                                issues.push(PlanIssue::ArgumentCount {
                                    step: name.to_string(),
                                    expected,
                                    got: args.len(),
                                });
                            }
                            Known::Contract(artifact)
                        }
                        None => Known::Value,
                    }
                }
                Step::Attach { artifact, .. } => {
                    match load_for(name, artifacts, artifact, &mut issues) {
                        Some(artifact) => Known::Contract(artifact),
                        None => Known::Value,
                    }
                }
                Step::CaptureBlock { .. } => Known::Value,
                Step::Invoke {
                    target,
                    function,
                    args,
                    ..
                } => {
                    let target_ref = Reference::Step(target.clone());
                    match known.get(target.as_str()) {
                        Some(Known::Contract(artifact)) => {
                            if let Err(e) = artifact.function(function, args.len()) {
                                issues.push(PlanIssue::Artifact {
                                    step: name.to_string(),
                                    reason: e.to_string(),
                                });
                            }
                        }
                        Some(_) => issues.push(PlanIssue::TargetNotContract {
                            step: name.to_string(),
                            target: target.clone(),
                        }),
                        None => {
                            check_reference(name, &target_ref, &known, &later_names, accounts, &mut issues)
                        }
                    }
                    if step.binds_value() {
                        Known::Value
                    } else {
                        Known::NoValue
                    }
                }
            };

            if known.contains_key(name) {
                issues.push(PlanIssue::DuplicateName {
                    index,
                    name: name.to_string(),
                });
            } else {
                known.insert(name, bound);
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

fn check_reference(
    step: &str,
    reference: &Reference,
    known: &HashMap<&str, Known>,
    later_names: &HashMap<&str, usize>,
    accounts: &AccountBook,
    issues: &mut Vec<PlanIssue>,
) {
    match reference {
        Reference::Account(account) => {
            if !accounts.contains(account) {
                issues.push(PlanIssue::UnknownAccount {
                    step: step.to_string(),
                    account: account.clone(),
                });
            }
        }
        Reference::Step(target) => match known.get(target.as_str()) {
            Some(Known::NoValue) => issues.push(PlanIssue::NoValue {
                step: step.to_string(),
                reference: reference.clone(),
            }),
            Some(_) => {}
            None if later_names.contains_key(target.as_str()) => {
                issues.push(PlanIssue::ForwardReference {
                    step: step.to_string(),
                    reference: reference.clone(),
                })
            }
            None => issues.push(PlanIssue::UnknownReference {
                step: step.to_string(),
                reference: reference.clone(),
            }),
        },
    }
}

fn load_for(
    step: &str,
    artifacts: &dyn ArtifactSource,
    artifact: &str,
    issues: &mut Vec<PlanIssue>,
) -> Option<Arc<Artifact>> {
    match artifacts.load(artifact) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            issues.push(PlanIssue::Artifact {
                step: step.to_string(),
                reason: e.to_string(),
            });
            None
        }
    }
}
