//! The per-test-case driver context and the part state machine.
//!
//! All mutation goes through the context: parts live in a flat arena owned
//! here and refer to each other by id, so parent back-references are plain
//! indices and the tree can be walked and rewritten without shared ownership.
//!
//! Invariant the close algorithm relies on: whenever a part resolves its
//! close, `current` moves to that part's parent. The drain loop in [`close`]
//! terminates because every inner close steps `current` one level up.
//!
//! [`close`]: TrackerContext::close

use std::cell::RefCell;

use tracing::{debug, instrument};

use crate::error::TrackerError;
use crate::part::{Part, PartId, PartKind};
use crate::state::{CycleState, PartState};

/// Name of the synthetic root part created by `start_run`.
pub const ROOT_NAME: &str = "{root}";

/// Per-test-case driver: owns the tracker tree and the cycle run-state.
#[derive(Debug, Default)]
pub struct TrackerContext {
    parts: Vec<Part>,
    root: Option<PartId>,
    current: Option<PartId>,
    cycle: CycleState,
}

impl TrackerContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin the set of cycles for one test case.
    ///
    /// Creates a fresh root section named `{root}` and returns its id. The
    /// current part stays unset until the first `start_cycle`.
    pub fn start_run(&mut self) -> Result<PartId, TrackerError> {
        if self.root.is_some() {
            return Err(TrackerError::RunInProgress);
        }
        self.parts.clear();
        let root = PartId(0);
        self.parts.push(Part::new(ROOT_NAME, PartKind::Section, None));
        self.root = Some(root);
        self.current = None;
        self.cycle = CycleState::Executing;
        debug!("run started");
        Ok(root)
    }

    /// Drop the tree and reset the run-state. Ids from this run go stale.
    pub fn end_run(&mut self) {
        self.parts.clear();
        self.root = None;
        self.current = None;
        self.cycle = CycleState::NotStarted;
        debug!("run ended");
    }

    /// Begin one re-execution of the test body.
    pub fn start_cycle(&mut self) -> Result<(), TrackerError> {
        let root = self.root.ok_or(TrackerError::NoActiveRun)?;
        self.current = Some(root);
        self.cycle = CycleState::Executing;
        Ok(())
    }

    /// Mark the current cycle done. Called implicitly by every close or fail
    /// that unwinds a part; after this, acquires stop opening parts until
    /// the next `start_cycle`.
    pub fn complete_cycle(&mut self) {
        self.cycle = CycleState::CompletedCycle;
    }

    pub fn completed_cycle(&self) -> bool {
        self.cycle == CycleState::CompletedCycle
    }

    pub fn run_in_progress(&self) -> bool {
        self.root.is_some()
    }

    /// Root of the current run, if one is in progress.
    pub fn root(&self) -> Option<PartId> {
        self.root
    }

    /// The innermost open part, or `None` outside a cycle.
    pub fn current_part(&self) -> Option<PartId> {
        self.current
    }

    /// Borrow a part by id.
    ///
    /// Panics on an id from a previous run; use [`get_part`] to probe.
    ///
    /// [`get_part`]: TrackerContext::get_part
    pub fn part(&self, id: PartId) -> &Part {
        &self.parts[id.0]
    }

    pub fn get_part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.0)
    }

    /// Look up a child of the current part by name.
    pub fn find_part(&self, name: &str) -> Option<PartId> {
        self.current.and_then(|current| self.find_child(current, name))
    }

    /// Linear search of `parent`'s children by name; first match wins.
    pub fn find_child(&self, parent: PartId, name: &str) -> Option<PartId> {
        self.parts[parent.0]
            .children
            .iter()
            .copied()
            .find(|child| self.parts[child.0].name == name)
    }

    /// Append a new part under `parent`. Sibling names must be unique.
    pub fn add_child(
        &mut self,
        parent: PartId,
        name: &str,
        kind: PartKind,
    ) -> Result<PartId, TrackerError> {
        if self.parts.get(parent.0).is_none() {
            return Err(TrackerError::UnknownPart(parent));
        }
        if let PartKind::Index { size: 0, .. } = kind {
            return Err(TrackerError::InvalidSize {
                name: name.to_string(),
            });
        }
        if self.find_child(parent, name).is_some() {
            return Err(TrackerError::DuplicateName {
                name: name.to_string(),
                parent: self.parts[parent.0].name.clone(),
            });
        }
        let id = PartId(self.parts.len());
        self.parts.push(Part::new(name, kind, Some(parent)));
        self.parts[parent.0].children.push(id);
        Ok(id)
    }

    /// Find or create the section `name` under the current part, opening it
    /// when it is still eligible this cycle.
    ///
    /// After the cycle has completed, later acquires in the same cycle still
    /// create and return the node but leave it `NotStarted`, so sibling
    /// sections further down the body are seen without being entered. A
    /// section that ended in a prior cycle is returned closed; the caller
    /// reads `is_open() == false` as "skip my body".
    #[instrument(skip_all, fields(name = %name))]
    pub fn acquire_section(&mut self, name: &str) -> Result<PartId, TrackerError> {
        let current = self.current.ok_or(TrackerError::NoActiveCycle)?;
        let id = match self.find_child(current, name) {
            Some(existing) => match self.parts[existing.0].kind {
                PartKind::Section => existing,
                PartKind::Index { .. } => {
                    return Err(TrackerError::KindMismatch {
                        name: name.to_string(),
                        parent: self.parts[current.0].name.clone(),
                    });
                }
            },
            None => self.add_child(current, name, PartKind::Section)?,
        };
        if !self.completed_cycle() && !self.parts[id.0].has_ended() {
            self.open(id);
        }
        Ok(id)
    }

    /// Find or create the generator `name` under the current part, advancing
    /// and opening it when it is still eligible this cycle.
    ///
    /// The advance is skipped when the generator is re-entered while it still
    /// has pending children from the current index (`ExecutingChildren`); it
    /// only moves to the next value once everything nested under the current
    /// value has ended.
    #[instrument(skip_all, fields(name = %name, size))]
    pub fn acquire_index(&mut self, name: &str, size: usize) -> Result<PartId, TrackerError> {
        if size == 0 {
            return Err(TrackerError::InvalidSize {
                name: name.to_string(),
            });
        }
        let current = self.current.ok_or(TrackerError::NoActiveCycle)?;
        let id = match self.find_child(current, name) {
            Some(existing) => match self.parts[existing.0].kind {
                PartKind::Index { size: recorded, .. } if recorded == size => existing,
                PartKind::Index { size: recorded, .. } => {
                    return Err(TrackerError::SizeMismatch {
                        name: name.to_string(),
                        recorded,
                        requested: size,
                    });
                }
                PartKind::Section => {
                    return Err(TrackerError::KindMismatch {
                        name: name.to_string(),
                        parent: self.parts[current.0].name.clone(),
                    });
                }
            },
            None => self.add_child(current, name, PartKind::Index { size, index: None })?,
        };
        if !self.completed_cycle() && !self.parts[id.0].has_ended() {
            if self.parts[id.0].state != PartState::ExecutingChildren {
                self.move_next(id);
            }
            self.open(id);
        }
        Ok(id)
    }

    /// Make `id` the current part and mark its ancestors as having an open
    /// descendant.
    pub fn open(&mut self, id: PartId) {
        self.parts[id.0].state = PartState::Executing;
        self.current = Some(id);
        debug!(part = %self.parts[id.0].name, "opened");
        if let Some(parent) = self.parts[id.0].parent {
            self.open_child(parent);
        }
    }

    /// Idempotent upward transition to `ExecutingChildren`, recursing into
    /// the parent chain until an ancestor already carries the mark.
    pub fn open_child(&mut self, id: PartId) {
        let mut next = Some(id);
        while let Some(part_id) = next {
            let part = &mut self.parts[part_id.0];
            if part.state == PartState::ExecutingChildren {
                break;
            }
            part.state = PartState::ExecutingChildren;
            next = part.parent;
        }
    }

    pub fn mark_needing_another_run(&mut self, id: PartId) -> Result<(), TrackerError> {
        let part = self
            .parts
            .get_mut(id.0)
            .ok_or(TrackerError::UnknownPart(id))?;
        part.state = PartState::NeedsAnotherRun;
        Ok(())
    }

    /// Exit the region normally.
    ///
    /// First drains any parts still open below this one (a generator the
    /// body did not advance out of, or anything left dangling by an early
    /// exit), then resolves this part's own state, moves `current` to the
    /// parent, and completes the cycle.
    pub fn close(&mut self, id: PartId) -> Result<(), TrackerError> {
        let Some(part) = self.parts.get(id.0) else {
            return Err(TrackerError::UnknownPart(id));
        };
        let name = part.name.clone();
        while self.current != Some(id) {
            let inner = self
                .current
                .ok_or_else(|| TrackerError::PartNotCurrent { name: name.clone() })?;
            self.resolve_close(inner)?;
            if self.current == Some(inner) {
                // The inner part did not unwind, so the open path does not
                // lead through `id` and draining further would spin.
                return Err(TrackerError::PartNotCurrent { name });
            }
        }
        self.resolve_close(id)
    }

    /// Exit the region because an assertion failed inside it.
    ///
    /// No drain: this part goes straight to `Failed` and the parent is
    /// flagged to run again so siblings can still be explored; the failed
    /// part itself has ended and is never retried.
    pub fn fail(&mut self, id: PartId) -> Result<(), TrackerError> {
        if self.parts.get(id.0).is_none() {
            return Err(TrackerError::UnknownPart(id));
        }
        self.parts[id.0].state = PartState::Failed;
        debug!(part = %self.parts[id.0].name, "failed");
        if let Some(parent) = self.parts[id.0].parent {
            self.mark_needing_another_run(parent)?;
        }
        self.current = self.parts[id.0].parent;
        self.complete_cycle();
        Ok(())
    }

    /// Resolve one part's close transition without draining.
    fn resolve_close(&mut self, id: PartId) -> Result<(), TrackerError> {
        let before = self.parts[id.0].state;
        let after = match before {
            // Ended in a prior cycle: nothing to do, and neither `current`
            // nor the cycle flag may move.
            PartState::CompletedSuccessfully | PartState::Failed => return Ok(()),
            PartState::Executing => PartState::CompletedSuccessfully,
            PartState::ExecutingChildren => {
                let pending = self.parts[id.0]
                    .children
                    .last()
                    .is_some_and(|last| !self.parts[last.0].has_ended());
                if pending {
                    // This cycle opened a new child that will be revisited
                    // on the next cycle.
                    PartState::ExecutingChildren
                } else {
                    PartState::CompletedSuccessfully
                }
            }
            PartState::NeedsAnotherRun => PartState::Executing,
            PartState::NotStarted => {
                return Err(TrackerError::UnexpectedState {
                    name: self.parts[id.0].name.clone(),
                    state: before,
                });
            }
        };
        self.parts[id.0].state = after;

        // A generator that has not yielded all its values stays eligible
        // for the next cycle.
        if let PartKind::Index { size, index } = self.parts[id.0].kind {
            if self.parts[id.0].state == PartState::CompletedSuccessfully
                && index.is_none_or(|i| i + 1 < size)
            {
                self.parts[id.0].state = PartState::Executing;
            }
        }

        debug!(
            part = %self.parts[id.0].name,
            from = ?before,
            to = ?self.parts[id.0].state,
            "closed"
        );
        self.current = self.parts[id.0].parent;
        self.complete_cycle();
        Ok(())
    }

    /// Advance a generator to its next index.
    ///
    /// Each generator value is a fresh iteration of everything nested inside
    /// it, so the children are dropped and re-discovered from scratch. The
    /// detached subtree stays in the arena until `end_run`.
    fn move_next(&mut self, id: PartId) {
        let PartKind::Index { size, index } = self.parts[id.0].kind else {
            return;
        };
        let next = index.map_or(0, |i| i + 1);
        self.parts[id.0].kind = PartKind::Index {
            size,
            index: Some(next),
        };
        self.parts[id.0].children.clear();
        debug!(part = %self.parts[id.0].name, index = next, "advanced");
    }
}

thread_local! {
    static DEFAULT_CONTEXT: RefCell<TrackerContext> = RefCell::new(TrackerContext::new());
}

/// Run `f` against this thread's default context.
///
/// Backs surface macros that cannot thread a context through the test body.
/// The context is thread-local, so hosts running test cases on multiple
/// threads get one independent tracker universe per thread.
pub fn with_default_context<R>(f: impl FnOnce(&mut TrackerContext) -> R) -> R {
    DEFAULT_CONTEXT.with(|ctx| f(&mut ctx.borrow_mut()))
}
