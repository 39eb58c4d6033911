use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::unbounded;
use engine_core::{EngineResult, EngineState, Parker};
use engine_scheduler::{run_job, WorkerPool};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::shared::Shared;

/// The continuous engine variant: a private control-loop thread driving a
/// bounded worker pool. `tick()` is not callable on this variant; ticks
/// happen on the private thread once `resume()` is called.
pub struct ContinuousEngine {
    shared: Arc<Shared>,
    pool: Mutex<Option<WorkerPool>>,
    control_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ContinuousEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Arc<Self>> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config.clone()));
        let pool = WorkerPool::new(config.total_threads());
        let engine = Arc::new(Self {
            shared,
            pool: Mutex::new(Some(pool)),
            control_thread: Mutex::new(None),
        });
        let loop_engine = engine.clone();
        let handle = std::thread::Builder::new()
            .name("engine-control-loop".into())
            .spawn(move || loop_engine.control_loop())
            .expect("failed to spawn control loop thread");
        *engine.control_thread.lock() = Some(handle);
        Ok(engine)
    }

    pub fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }

    /// Moves the engine from Paused into the running rotation. The control
    /// loop thread picks up ticking once this succeeds.
    pub fn resume(&self) -> EngineResult<bool> {
        self.shared
            .transition(EngineState::InWait, &[EngineState::Paused])
    }

    /// Pauses the engine; may preempt mid-tick (InTick) or between ticks
    /// (InWait). Idle until `resume()` is called again.
    pub fn pause(&self) -> EngineResult<bool> {
        self.shared
            .transition(EngineState::Paused, &[EngineState::InTick, EngineState::InWait])
    }

    /// Stops the engine, bounded by `termination_timeout` overall.
    ///
    /// An action that ignores `context.is_cancelled()` runs to completion
    /// per §5, so neither the control-loop thread nor a worker can be
    /// assumed to exit promptly. Both waits below poll liveness with a
    /// shared deadline rather than calling `JoinHandle::join` directly,
    /// which has no timeout and would block `stop()` indefinitely on a
    /// single non-cooperating action.
    pub fn stop(&self) {
        let flags = self.shared.begin_stop();
        drop(flags); // cooperative cancellation already requested; nothing more to poll here
        let deadline = Instant::now() + self.shared.config().termination_timeout();

        let handle = self.control_thread.lock().take();
        if let Some(handle) = handle {
            handle.thread().unpark();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if Instant::now() >= deadline {
                    warn!("control loop did not exit within termination timeout, abandoning");
                    break;
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }

        let pool = self.pool.lock().take();
        if let Some(pool) = pool {
            pool.shutdown(deadline.saturating_duration_since(Instant::now()));
        }
    }

    fn control_loop(self: Arc<Self>) {
        let parker = Parker::new(self.shared.config().spin_yield_threshold());
        let interval = self.shared.tick_info.interval();
        let mut last_start = Instant::now();
        let mut last_tps_calc = Instant::now();
        let mut ticks_this_second: u32 = 0;

        loop {
            match self.shared.transition(EngineState::InTick, &[EngineState::InWait]) {
                Err(_) => break, // Stopped
                Ok(false) => {
                    if self.shared.state() == EngineState::Stopped {
                        break;
                    }
                    std::thread::park_timeout(Duration::from_millis(5));
                    continue;
                }
                Ok(true) => {}
            }

            let start = Instant::now();
            let estimated_end = start + interval;
            self.shared.tick_info.set_delta(start - last_start);
            last_start = start;

            if start - last_tps_calc >= Duration::from_secs(1) {
                self.shared.tick_info.set_current_tps(ticks_this_second);
                last_tps_calc = start;
                ticks_this_second = 0;
            }

            self.shared.run_first_hook();

            let due = self.shared.board.drain_before(estimated_end);
            let dispatched = due.len();
            if dispatched > 0 {
                let (done_tx, done_rx) = unbounded::<()>();
                for job in due {
                    let id = job.context.id();
                    self.shared.board.mark_in_flight(id, job.context.cancel_flag());
                    let board = self.shared.board.clone();
                    let done_tx = done_tx.clone();
                    let pool_guard = self.pool.lock();
                    if let Some(pool) = pool_guard.as_ref() {
                        pool.submit(Box::new(move || {
                            run_job(&board, job);
                            let _ = done_tx.send(());
                        }));
                    }
                }
                drop(done_tx);
                for _ in 0..dispatched {
                    let _ = done_rx.recv();
                }
            }

            self.shared.run_last_hook();
            self.shared.bindings.clear_tick_bindings();
            self.shared.tick_info.increment_ticks();
            ticks_this_second += 1;

            if self
                .shared
                .transition(EngineState::InWait, &[EngineState::InTick])
                .unwrap_or(false)
            {
                parker.park_until(estimated_end);
            }
        }
        debug!("control loop exiting");
    }
}
