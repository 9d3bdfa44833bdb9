//! Per-step lifecycle.
//!
//! ```text
//! Pending ──▶ Submitted ──▶ Confirmed
//!    │            │
//!    │            └──────▶ Failed
//!    ├──▶ Confirmed        (reads, block captures, attaches)
//!    ├──▶ Failed
//!    └──▶ Skipped          (an earlier step failed)
//! ```

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    /// Transaction broadcast, hash known, no receipt yet.
    Submitted,
    Confirmed,
    Failed,
    /// Never attempted because the plan aborted earlier.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal step transition {from} -> {to}")]
pub struct IllegalTransition {
    pub from: StepState,
    pub to: StepState,
}

impl StepState {
    pub fn can_transition(self, next: StepState) -> bool {
        use StepState::*;
        matches!(
            (self, next),
            (Pending, Submitted | Confirmed | Failed | Skipped) | (Submitted, Confirmed | Failed)
        )
    }

    pub fn transition(self, next: StepState) -> Result<StepState, IllegalTransition> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepState::Confirmed | StepState::Failed | StepState::Skipped
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Submitted => "submitted",
            StepState::Confirmed => "confirmed",
            StepState::Failed => "failed",
            StepState::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
