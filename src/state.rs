//! Lifecycle states for parts and cycles.
//!
//! These enums define stable contracts between the tracker and its host.
//! They are deterministic, carry no references, and serialize for reporters.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a single part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartState {
    /// Never opened in any cycle so far.
    NotStarted,
    /// Open in the current cycle, no child opened beneath it yet.
    Executing,
    /// Has (or had) an open descendant during this run.
    ExecutingChildren,
    /// Flagged by a failing child; recovers to `Executing` on close.
    NeedsAnotherRun,
    /// Closed with nothing left pending underneath. Terminal.
    CompletedSuccessfully,
    /// Ended by `fail`. Terminal; never reopened.
    Failed,
}

impl PartState {
    pub fn has_started(self) -> bool {
        self != PartState::NotStarted
    }

    pub fn has_ended(self) -> bool {
        matches!(
            self,
            PartState::CompletedSuccessfully | PartState::Failed
        )
    }

    /// Open means started and not yet ended.
    pub fn is_open(self) -> bool {
        self.has_started() && !self.has_ended()
    }
}

/// Run-state of the context across one execution cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// No run in progress.
    #[default]
    NotStarted,
    /// A cycle is executing the test body.
    Executing,
    /// The cycle unwound to the top; acquires no longer open parts.
    CompletedCycle,
}
