//! The job board, worker pool, and shared per-job execution routine used by
//! both engine variants.

pub mod pool;
pub mod queue;
pub mod runner;

pub use pool::WorkerPool;
pub use queue::JobBoard;
pub use runner::{run_hook, run_job};
