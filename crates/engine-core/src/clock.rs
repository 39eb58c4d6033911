use std::time::{Duration, Instant};

/// Sleeps the calling thread until `deadline`, using a hybrid strategy: park
/// for the bulk of the remaining time, then spin-yield for the last stretch
/// to land closer to the target than a single OS sleep typically allows.
pub struct Parker {
    spin_threshold: Duration,
}

impl Parker {
    pub fn new(spin_threshold: Duration) -> Self {
        Self { spin_threshold }
    }

    /// Parks/spins until `deadline`. Returns immediately if already past it.
    pub fn park_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            let remaining = deadline - now;
            if remaining > self.spin_threshold {
                std::thread::park_timeout(remaining - self.spin_threshold);
            } else {
                std::thread::yield_now();
            }
        }
    }
}
