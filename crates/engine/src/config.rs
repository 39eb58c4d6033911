use std::time::Duration;

use engine_core::{EngineError, EngineResult};

/// Builder for engine configuration, mirroring the `SystemConfig::new()
/// .with_*(...)` builder style: construct with defaults, then override.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    tps: u32,
    total_threads: usize,
    spin_yield_threshold: Duration,
    termination_timeout: Duration,
}

impl EngineConfig {
    pub fn new(tps: u32, total_threads: usize) -> Self {
        Self {
            tps,
            total_threads,
            spin_yield_threshold: Duration::from_millis(10),
            termination_timeout: Duration::from_secs(2),
        }
    }

    pub fn with_spin_yield_threshold(mut self, threshold: Duration) -> Self {
        self.spin_yield_threshold = threshold;
        self
    }

    pub fn with_termination_timeout(mut self, timeout: Duration) -> Self {
        self.termination_timeout = timeout;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.tps == 0 {
            return Err(EngineError::InvalidArgument(
                "tps must be positive".into(),
            ));
        }
        if self.total_threads == 0 {
            return Err(EngineError::InvalidArgument(
                "total_threads must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn tps(&self) -> u32 {
        self.tps
    }

    pub fn total_threads(&self) -> usize {
        self.total_threads
    }

    pub fn spin_yield_threshold(&self) -> Duration {
        self.spin_yield_threshold
    }

    pub fn termination_timeout(&self) -> Duration {
        self.termination_timeout
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(64, 4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tps_is_invalid() {
        let cfg = EngineConfig::new(0, 1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_threads_is_invalid() {
        let cfg = EngineConfig::new(10, 0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }
}
