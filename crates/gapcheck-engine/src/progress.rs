//! Injected progress observer.
//!
//! The engine has no ambient I/O dependency: callers pass a sink and the
//! engine fires run and phase transitions into it, fire-and-forget. The
//! default sink does nothing.

use gapcheck_registry::{Phase, RunId};
use gapcheck_utils::status::{OverallStatus, PhaseStatus, RunStatus};

/// Observer for pipeline progress.
///
/// Implementations must be cheap and non-blocking; the engine calls them
/// inline from the coordinating task and does not await acknowledgment.
pub trait ProgressSink: Send + Sync {
    fn on_run(&self, run: RunId, status: RunStatus) {
        let _ = (run, status);
    }

    fn on_phase(&self, phase: Phase, status: PhaseStatus) {
        let _ = (phase, status);
    }

    /// Overall pipeline status transitions, from `Phase1Running` through a
    /// terminal state.
    fn on_status(&self, status: OverallStatus) {
        let _ = status;
    }

    /// Overall progress in percent, derived from phase ranges.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }
}

/// A sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}
