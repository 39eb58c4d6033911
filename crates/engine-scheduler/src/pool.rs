use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::warn;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Bounded pool of native worker threads.
///
/// Submitting blocks the caller once `capacity` tasks are queued or
/// executing — back-pressure onto the control loop rather than unbounded
/// queueing, the same shape as a `crossbeam_channel::bounded` dispatch
/// channel feeding a fixed set of workers.
pub struct WorkerPool {
    sender: Sender<Task>,
    exit_rx: Receiver<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver): (Sender<Task>, Receiver<Task>) = bounded(capacity);
        let (exit_tx, exit_rx) = unbounded::<()>();
        let mut workers = Vec::with_capacity(capacity);
        for idx in 0..capacity {
            let receiver = receiver.clone();
            let exit_tx = exit_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("engine-worker-{idx}"))
                .spawn(move || {
                    for task in receiver {
                        let result = catch_unwind(AssertUnwindSafe(task));
                        if result.is_err() {
                            warn!("worker pool task panicked");
                        }
                    }
                    let _ = exit_tx.send(());
                })
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        Self {
            sender,
            exit_rx,
            workers,
        }
    }

    /// Submits a task; blocks if every worker is already busy and the
    /// channel is full.
    pub fn submit(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("worker pool submit after shutdown, dropping task");
        }
    }

    /// Closes the dispatch channel and waits up to `timeout` for workers to
    /// drain their current task and exit.
    ///
    /// Bounded by polling each worker's exit signal with `recv_timeout`
    /// rather than calling `JoinHandle::join` unconditionally — a join has
    /// no timeout, so a single worker stuck in a non-cooperating action
    /// would otherwise block `shutdown` past its deadline regardless of how
    /// carefully the deadline itself is tracked. Workers that haven't
    /// reported exit by the deadline are left detached; native threads
    /// can't be forcibly interrupted.
    pub fn shutdown(self, timeout: Duration) {
        drop(self.sender);
        let deadline = Instant::now() + timeout;
        let mut exited = 0usize;
        while exited < self.workers.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.exit_rx.recv_timeout(remaining) {
                Ok(()) => exited += 1,
                Err(_) => break,
            }
        }
        if exited < self.workers.len() {
            warn!(
                remaining_workers = self.workers.len() - exited,
                "worker pool shutdown timed out, abandoning remaining workers"
            );
        }
        // Only join workers we know already returned; this never blocks.
        for handle in self.workers {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}
