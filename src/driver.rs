//! Reference cycle loop for hosts driving a test-case body.
//!
//! A drive brackets one run: `start_run`, then one cycle per re-execution of
//! the body until the root has ended, then `end_run`. The body performs the
//! acquires, closes, and fails a surface macro expansion would; the driver
//! owns cycle bookkeeping and closes the root after each pass.

use tracing::debug;

use crate::context::TrackerContext;
use crate::error::TrackerError;
use crate::snapshot::PartSnapshot;
use crate::state::PartState;

/// Configuration for one drive.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    /// Cap on body re-executions. A body that keeps discovering new parts
    /// (i.e. is not deterministic) would otherwise cycle forever; hitting
    /// the cap stops the drive with `MaxCyclesExceeded`.
    pub max_cycles: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self { max_cycles: 1024 }
    }
}

/// Why the drive loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriveStop {
    /// The root ended: every reachable leaf path has been visited.
    Complete,
    /// The configured cycle cap was hit before the root ended.
    MaxCyclesExceeded { cycles_run: u32, max_cycles: u32 },
}

/// Summary of one completed cycle, handed to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Cycle number, 1-indexed.
    pub cycle: u32,
    /// Root state after the cycle closed.
    pub root_state: PartState,
}

/// Summary of a whole drive.
#[derive(Debug, Clone)]
pub struct DriveOutcome {
    pub cycles_run: u32,
    pub stop: DriveStop,
    /// Final tree, captured before `end_run` tore it down.
    pub snapshot: PartSnapshot,
    /// Paths (from the root) of parts that ended `Failed`.
    pub failed: Vec<String>,
}

/// Run `body` once per cycle until the root ends or the cap is hit.
///
/// The body must acquire at least one part on its first cycle; closing a
/// root under which nothing ever opened is a usage error. Errors from the
/// body or the tracker abort the drive after tearing the run down.
pub fn drive<B, F>(
    ctx: &mut TrackerContext,
    config: &DriveConfig,
    mut body: B,
    mut on_cycle: F,
) -> Result<DriveOutcome, TrackerError>
where
    B: FnMut(&mut TrackerContext) -> Result<(), TrackerError>,
    F: FnMut(&CycleOutcome),
{
    let root = ctx.start_run()?;
    let mut cycles_run = 0u32;
    let stop = loop {
        if cycles_run >= config.max_cycles {
            break DriveStop::MaxCyclesExceeded {
                cycles_run,
                max_cycles: config.max_cycles,
            };
        }
        ctx.start_cycle()?;
        if let Err(err) = body(ctx).and_then(|()| ctx.close(root)) {
            ctx.end_run();
            return Err(err);
        }
        cycles_run += 1;
        let root_state = ctx.part(root).state();
        debug!(cycle = cycles_run, state = ?root_state, "cycle closed");
        on_cycle(&CycleOutcome {
            cycle: cycles_run,
            root_state,
        });
        if ctx.part(root).has_ended() {
            break DriveStop::Complete;
        }
    };
    let snapshot = PartSnapshot::capture(ctx, root);
    let failed = snapshot.failed_paths();
    ctx.end_run();
    Ok(DriveOutcome {
        cycles_run,
        stop,
        snapshot,
        failed,
    })
}
