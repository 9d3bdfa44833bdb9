//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DeployerConfig (validated, immutable)
//!     → credentials.rs (API key + private keys from the environment)
//!     → handed explicitly to the chain client and orchestrator
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets never live in the config file, only their variable names

pub mod credentials;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::{AccountKey, Credentials};
pub use loader::{load_config, ConfigError};
pub use schema::{AccountsConfig, ArtifactsConfig, DeployerConfig, NetworkConfig, ObservabilityConfig};
