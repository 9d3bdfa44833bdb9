//! Metrics collection.
//!
//! # Metrics
//! - `deployer_steps_total` (counter): plan steps by kind and outcome
//! - `deployer_confirmation_seconds` (histogram): submit-to-receipt latency
//! - `deployer_rpc_healthy` (gauge): 1=reachable, 0=unreachable
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder
//! is installed.

use std::time::Duration;

/// Record the outcome of one plan step.
pub fn record_step(kind: &'static str, outcome: &'static str) {
    metrics::counter!("deployer_steps_total", "kind" => kind, "outcome" => outcome).increment(1);
}

/// Record how long a transaction took to confirm.
pub fn record_confirmation(elapsed: Duration) {
    metrics::histogram!("deployer_confirmation_seconds").record(elapsed.as_secs_f64());
}

/// Record RPC reachability.
pub fn record_rpc_health(healthy: bool) {
    metrics::gauge!("deployer_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
}
