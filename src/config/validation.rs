//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, multiplier sane)
//! - Detect account name collisions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DeployerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::{DeployerConfig, API_KEY_PLACEHOLDER};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check a parsed configuration for semantic problems.
pub fn validate_config(config: &DeployerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let network = &config.network;

    // The placeholder is substituted later; only the shape is checked here.
    let probe = network.rpc_url.replace(API_KEY_PLACEHOLDER, "key");
    if let Err(e) = probe.parse::<url::Url>() {
        errors.push(ValidationError::new("network.rpc_url", format!("invalid URL: {}", e)));
    }
    for (i, failover) in network.failover_urls.iter().enumerate() {
        if failover.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                &format!("network.failover_urls[{}]", i),
                format!("invalid URL '{}'", failover),
            ));
        }
    }
    if network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }
    if network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be > 0"));
    }
    if network.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("network.confirmation_timeout_secs", "must be > 0"));
    }
    if network.poll_interval_ms == 0 {
        errors.push(ValidationError::new("network.poll_interval_ms", "must be > 0"));
    }
    if network.max_poll_interval_ms < network.poll_interval_ms {
        errors.push(ValidationError::new(
            "network.max_poll_interval_ms",
            "must be >= poll_interval_ms",
        ));
    }
    if !(1.0..=10.0).contains(&network.gas_price_multiplier) {
        errors.push(ValidationError::new(
            "network.gas_price_multiplier",
            "must be between 1.0 and 10.0",
        ));
    }
    if network.max_gas_price_gwei == 0 {
        errors.push(ValidationError::new("network.max_gas_price_gwei", "must be > 0"));
    }

    let accounts = &config.accounts;
    if accounts.deployer_name.is_empty() {
        errors.push(ValidationError::new("accounts.deployer_name", "must not be empty"));
    }
    if accounts.deployer_key_env.is_empty() {
        errors.push(ValidationError::new("accounts.deployer_key_env", "must not be empty"));
    }
    if accounts.extra.contains_key(&accounts.deployer_name) {
        errors.push(ValidationError::new(
            "accounts.extra",
            format!("'{}' is already the deployer account", accounts.deployer_name),
        ));
    }

    if config.artifacts.dir.is_empty() {
        errors.push(ValidationError::new("artifacts.dir", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&DeployerConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = DeployerConfig::default();
        config.network.rpc_url = "not a url".to_string();
        config.network.confirmation_timeout_secs = 0;
        config.network.gas_price_multiplier = 0.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "network.rpc_url"));
        assert!(errors.iter().any(|e| e.field == "network.confirmation_timeout_secs"));
    }

    #[test]
    fn test_extra_account_cannot_shadow_deployer() {
        let mut config = DeployerConfig::default();
        config.accounts.extra.insert("deployer".to_string(), "OTHER_KEY".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "accounts.extra");
    }
}
