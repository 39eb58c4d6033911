use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use engine_core::Job;
use tracing::warn;

use crate::queue::JobBoard;

/// Runs a single job's action, catching any panic so it never propagates out
/// of the worker thread or the manual caller's stack. If the job is
/// periodic and wasn't cancelled, re-inserts it into the board with
/// `estimated = now() + period`, computed *after* completion so a slow
/// action degrades to `1/runtime` throughput instead of catching up.
pub fn run_job(board: &JobBoard, job: Job) {
    let id = job.context.id();
    let cancelled_before = job.context.is_cancelled();
    if !cancelled_before {
        let result = catch_unwind(AssertUnwindSafe(|| job.action.perform(&job.context)));
        if result.is_err() {
            warn!(action_id = %id, "action panicked during perform");
        }
    }
    board.mark_done(id);
    if !job.context.is_cancelled() && job.context.is_periodic() {
        let estimated = Instant::now() + job.context.period();
        board.insert(Job {
            action: job.action,
            context: job.context,
            estimated,
        });
    }
}

/// Runs a single-slot hook (first/last action) inline on the control loop
/// thread. Hooks never participate in the futures map or cancellation.
pub fn run_hook(action: &dyn engine_core::Action, context: &engine_core::ActionContext) {
    let result = catch_unwind(AssertUnwindSafe(|| action.perform(context)));
    if result.is_err() {
        warn!("engine hook panicked during perform");
    }
}
