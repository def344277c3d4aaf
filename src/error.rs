//! Usage errors surfaced by the tracker.
//!
//! These cover logic invariants broken by the host framework. Test failures
//! are not errors: they flow through `fail` as ordinary part states.

use thiserror::Error;

use crate::part::PartId;
use crate::state::PartState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// `start_run` called while a previous run still holds the tree.
    #[error("a run is already in progress (call end_run first)")]
    RunInProgress,

    /// Cycle or tree operation with no active run.
    #[error("no run is in progress (call start_run first)")]
    NoActiveRun,

    /// Acquire with no current part set, i.e. before `start_cycle`.
    #[error("no cycle is in progress (call start_cycle first)")]
    NoActiveCycle,

    /// A part id that does not belong to the current run's tree.
    #[error("part id {0:?} does not belong to the current run")]
    UnknownPart(PartId),

    /// Two children of one parent may not share a name.
    #[error("'{name}' already exists under '{parent}'")]
    DuplicateName { name: String, parent: String },

    /// A name resolved to an existing sibling of the other kind.
    #[error("'{name}' already exists under '{parent}' as a different kind of part")]
    KindMismatch { name: String, parent: String },

    /// A generator re-acquired with a size other than the recorded one.
    #[error(
        "generator '{name}' was created with size {recorded} but re-acquired with size {requested}"
    )]
    SizeMismatch {
        name: String,
        recorded: usize,
        requested: usize,
    },

    /// Generators iterate over at least one value.
    #[error("generator '{name}' must have a positive size")]
    InvalidSize { name: String },

    /// `close` reached a part in a state it cannot resolve.
    #[error("cannot close '{name}' from state {state:?}")]
    UnexpectedState { name: String, state: PartState },

    /// `close` on a part that is not on the currently open path.
    #[error("cannot close '{name}': it is not on the currently open path")]
    PartNotCurrent { name: String },
}
