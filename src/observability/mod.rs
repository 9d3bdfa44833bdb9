//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! orchestrator + blockchain produce:
//!     → logging.rs (structured progress events, one span per plan run)
//!     → metrics.rs (step counters, confirmation latency, RPC health)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → any `metrics` recorder installed by an embedding host
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
