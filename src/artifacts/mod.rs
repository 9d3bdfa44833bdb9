//! Compiled contract artifacts (ABI + creation bytecode).
//!
//! # Data Flow
//! ```text
//! Hardhat / Foundry JSON on disk
//!     → loader.rs (ArtifactDirectory: locate, parse, cache)
//!     → Artifact (immutable, shared via Arc)
//!     → orchestrator (constructor/function lookup, encoding)
//! ```

pub mod loader;

use std::sync::Arc;

use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::primitives::Bytes;
use serde_json::Value;
use thiserror::Error;

pub use loader::{ArtifactDirectory, StaticArtifacts};

/// Errors raised while locating or reading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact '{name}' not found (searched: {searched})")]
    NotFound { name: String, searched: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid artifact '{name}': {reason}")]
    Invalid { name: String, reason: String },

    #[error("function '{function}' not found on '{artifact}'")]
    UnknownFunction { artifact: String, function: String },

    #[error("'{artifact}.{function}' has no overload taking {arity} argument(s)")]
    ArityMismatch {
        artifact: String,
        function: String,
        arity: usize,
    },

    #[error("'{artifact}.{function}' is ambiguous with {arity} argument(s); use the full signature")]
    Ambiguous {
        artifact: String,
        function: String,
        arity: usize,
    },
}

/// Anything that can hand out artifacts by contract name.
pub trait ArtifactSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Arc<Artifact>, ArtifactError>;
}

/// A compiled contract.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub abi: JsonAbi,
    /// Creation bytecode; empty for interfaces and abstract contracts.
    pub bytecode: Bytes,
}

impl Artifact {
    pub fn new(name: &str, abi: JsonAbi, bytecode: Bytes) -> Self {
        Self {
            name: name.to_string(),
            abi,
            bytecode,
        }
    }

    /// Parse a Hardhat (`"bytecode": "0x…"`) or Foundry
    /// (`"bytecode": {"object": "0x…"}`) artifact document.
    pub fn from_json(name: &str, document: &Value) -> Result<Self, ArtifactError> {
        let invalid = |reason: String| ArtifactError::Invalid {
            name: name.to_string(),
            reason,
        };

        let abi_value = document
            .get("abi")
            .cloned()
            .ok_or_else(|| invalid("missing 'abi'".to_string()))?;
        let abi: JsonAbi =
            serde_json::from_value(abi_value).map_err(|e| invalid(format!("bad ABI: {}", e)))?;

        let bytecode_hex = match document.get("bytecode") {
            Some(Value::String(s)) => s.as_str(),
            Some(Value::Object(obj)) => obj
                .get("object")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid("bytecode object has no 'object'".to_string()))?,
            Some(_) => return Err(invalid("'bytecode' has unexpected type".to_string())),
            None => return Err(invalid("missing 'bytecode'".to_string())),
        };
        let hex_str = bytecode_hex.strip_prefix("0x").unwrap_or(bytecode_hex);
        let bytecode = alloy::hex::decode(hex_str)
            .map(Bytes::from)
            .map_err(|e| invalid(format!("invalid bytecode hex: {}", e)))?;

        Ok(Self::new(name, abi, bytecode))
    }

    pub fn is_deployable(&self) -> bool {
        !self.bytecode.is_empty()
    }

    /// Constructor parameters, empty when the contract declares none.
    pub fn constructor_inputs(&self) -> &[Param] {
        self.abi
            .constructor
            .as_ref()
            .map(|c| c.inputs.as_slice())
            .unwrap_or(&[])
    }

    /// Find a function by name (picking the overload with `arity` inputs)
    /// or by full signature such as `transfer(address,uint256)`.
    pub fn function(&self, name_or_signature: &str, arity: usize) -> Result<&Function, ArtifactError> {
        if name_or_signature.contains('(') {
            return self
                .abi
                .functions()
                .find(|f| f.signature() == name_or_signature)
                .ok_or_else(|| ArtifactError::UnknownFunction {
                    artifact: self.name.clone(),
                    function: name_or_signature.to_string(),
                });
        }

        let overloads = self
            .abi
            .function(name_or_signature)
            .ok_or_else(|| ArtifactError::UnknownFunction {
                artifact: self.name.clone(),
                function: name_or_signature.to_string(),
            })?;
        let mut matching = overloads.iter().filter(|f| f.inputs.len() == arity);
        match (matching.next(), matching.next()) {
            (Some(f), None) => Ok(f),
            (None, _) => Err(ArtifactError::ArityMismatch {
                artifact: self.name.clone(),
                function: name_or_signature.to_string(),
                arity,
            }),
            (Some(_), Some(_)) => Err(ArtifactError::Ambiguous {
                artifact: self.name.clone(),
                function: name_or_signature.to_string(),
                arity,
            }),
        }
    }
}
