use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Live, lock-free-readable tick statistics. Writes happen only on the
/// control loop thread; reads may happen from any thread via a shared
/// `Arc<TickInfo>` handle.
#[derive(Default)]
pub struct TickInfo {
    tps_configured: AtomicU32,
    interval_nanos: AtomicU64,
    current_tps: AtomicU32,
    delta_nanos: AtomicU64,
    ticks: AtomicU64,
}

impl TickInfo {
    pub fn new(tps_configured: u32) -> Self {
        let interval_nanos = if tps_configured == 0 {
            0
        } else {
            1_000_000_000u64 / tps_configured as u64
        };
        Self {
            tps_configured: AtomicU32::new(tps_configured),
            interval_nanos: AtomicU64::new(interval_nanos),
            current_tps: AtomicU32::new(0),
            delta_nanos: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
        }
    }

    pub fn tps_configured(&self) -> u32 {
        self.tps_configured.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Relaxed))
    }

    pub fn current_tps(&self) -> u32 {
        self.current_tps.load(Ordering::Relaxed)
    }

    pub fn delta(&self) -> Duration {
        Duration::from_nanos(self.delta_nanos.load(Ordering::Relaxed))
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Mutators below are written only by a control loop (continuous or
    /// manual variant); they're `pub` so those live in the `engine` crate,
    /// but callers outside a control loop shouldn't use them.

    pub fn set_delta(&self, d: Duration) {
        self.delta_nanos.store(d.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn set_current_tps(&self, tps: u32) {
        self.current_tps.store(tps, Ordering::Relaxed);
    }

    pub fn increment_ticks(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_derived_from_tps() {
        let info = TickInfo::new(100);
        assert_eq!(info.interval(), Duration::from_millis(10));
    }

    #[test]
    fn ticks_increment() {
        let info = TickInfo::new(10);
        assert_eq!(info.increment_ticks(), 1);
        assert_eq!(info.increment_ticks(), 2);
        assert_eq!(info.ticks(), 2);
    }
}
