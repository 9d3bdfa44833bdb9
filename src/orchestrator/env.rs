//! Bindings produced by completed steps.

use std::sync::Arc;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, U256};

use crate::artifacts::Artifact;
use crate::blockchain::wallet::AccountBook;
use crate::orchestrator::encoding::{coerce_literal, conform};
use crate::orchestrator::error::OrchestratorError;
use crate::orchestrator::plan::{Arg, Reference};

/// What a completed step left behind.
#[derive(Debug, Clone)]
pub enum Binding {
    Contract {
        address: Address,
        artifact: Arc<Artifact>,
    },
    Block(u64),
    /// Output of a read; multiple return values are kept as a tuple.
    Output(DynSolValue),
}

impl Binding {
    /// The value a `$name` reference substitutes.
    pub fn value(&self) -> DynSolValue {
        match self {
            Binding::Contract { address, .. } => DynSolValue::Address(*address),
            Binding::Block(number) => DynSolValue::Uint(U256::from(*number), 256),
            Binding::Output(value) => value.clone(),
        }
    }
}

/// Append-only name → binding map, in the order names were bound.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    entries: Vec<(String, Binding)>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. Rebinding a name is refused.
    pub fn bind(&mut self, name: &str, binding: Binding) -> Result<(), OrchestratorError> {
        if self.get(name).is_some() {
            return Err(OrchestratorError::Configuration(format!(
                "'{}' is already bound",
                name
            )));
        }
        self.entries.push((name.to_string(), binding));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.entries
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, binding)| binding)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.entries.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a contract binding.
    pub fn contract(&self, name: &str) -> Result<(Address, Arc<Artifact>), OrchestratorError> {
        match self.get(name) {
            Some(Binding::Contract { address, artifact }) => Ok((*address, artifact.clone())),
            Some(_) => Err(OrchestratorError::Configuration(format!(
                "'{}' is not a contract",
                name
            ))),
            None => Err(OrchestratorError::UnresolvedReference(Reference::Step(
                name.to_string(),
            ))),
        }
    }

    /// Substitute a reference with its bound value.
    pub fn resolve(
        &self,
        reference: &Reference,
        accounts: &AccountBook,
    ) -> Result<DynSolValue, OrchestratorError> {
        let found = match reference {
            Reference::Step(name) => self.get(name).map(Binding::value),
            Reference::Account(name) => accounts.get(name).map(DynSolValue::Address),
        };
        found.ok_or_else(|| OrchestratorError::UnresolvedReference(reference.clone()))
    }

    /// Turn a plan argument into a value of the parameter type `ty`.
    pub fn resolve_arg(
        &self,
        arg: &Arg,
        ty: &DynSolType,
        accounts: &AccountBook,
    ) -> Result<DynSolValue, OrchestratorError> {
        let abi_error = |detail: String| OrchestratorError::Abi(detail);
        match arg {
            Arg::Value(value) => conform(value.clone(), ty).map_err(abi_error),
            Arg::Literal(text) => coerce_literal(text, ty).map_err(|e| {
                abi_error(format!("cannot use '{}' as {}: {}", text, ty.sol_type_name(), e))
            }),
            Arg::Ref(reference) => {
                let value = self.resolve(reference, accounts)?;
                conform(value, ty)
                    .map_err(|e| abi_error(format!("{} as {}: {}", reference, ty.sol_type_name(), e)))
            }
            Arg::List(items) => match ty {
                DynSolType::Array(inner) => items
                    .iter()
                    .map(|item| self.resolve_arg(item, inner, accounts))
                    .collect::<Result<Vec<_>, _>>()
                    .map(DynSolValue::Array),
                DynSolType::FixedArray(inner, len) if *len == items.len() => items
                    .iter()
                    .map(|item| self.resolve_arg(item, inner, accounts))
                    .collect::<Result<Vec<_>, _>>()
                    .map(DynSolValue::FixedArray),
                other => Err(abi_error(format!(
                    "list of {} item(s) given for {}",
                    items.len(),
                    other.sol_type_name()
                ))),
            },
        }
    }
}
