//! Resilience helpers for talking to a remote node.
//!
//! # Data Flow
//! ```text
//! Waiting for a receipt:
//!     → backoff.rs (capped, jittered delay between polls)
//!     → tokio::time::timeout around the whole wait (hard confirmation bound)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline
//! - No automatic re-submission: a failed transaction aborts the plan

pub mod backoff;

pub use backoff::{calculate_backoff, PollSchedule};
