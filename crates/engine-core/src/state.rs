use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Paused = 0,
    InTick = 1,
    InWait = 2,
    Stopped = 3,
}

impl EngineState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => EngineState::Paused,
            1 => EngineState::InTick,
            2 => EngineState::InWait,
            3 => EngineState::Stopped,
            _ => unreachable!("invalid engine state byte"),
        }
    }
}

/// The engine's 4-state machine: Paused, InTick, InWait, Stopped.
///
/// Reads are lock-free via an atomic mirror; `try_transition` serializes
/// writers through a mutex so two racing callers can't both observe the same
/// expected-from state and both "win" the transition.
pub struct StateMachine {
    current: AtomicU8,
    write_lock: Mutex<()>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            current: AtomicU8::new(EngineState::Paused as u8),
            write_lock: Mutex::new(()),
        }
    }

    pub fn current(&self) -> EngineState {
        EngineState::from_u8(self.current.load(Ordering::Acquire))
    }

    /// Attempts to move to `new_state` if the current state is one of
    /// `expected_from`. Stopped is terminal and always an error, regardless
    /// of `expected_from`. Returns whether the transition actually happened.
    pub fn try_transition(
        &self,
        new_state: EngineState,
        expected_from: &[EngineState],
    ) -> EngineResult<bool> {
        let _guard = self.write_lock.lock();
        let current = self.current();
        if current == EngineState::Stopped {
            return Err(EngineError::EngineStopped);
        }
        if !expected_from.contains(&current) {
            return Ok(false);
        }
        self.current.store(new_state as u8, Ordering::Release);
        Ok(true)
    }

    /// `stop()` is special: idempotent once already Stopped, unlike every
    /// other transition which errors from Stopped. The façade calls this
    /// instead of `try_transition` for the stop path.
    pub fn force_stop(&self) -> bool {
        let _guard = self.write_lock.lock();
        if self.current() == EngineState::Stopped {
            return false;
        }
        self.current.store(EngineState::Stopped as u8, Ordering::Release);
        true
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused() {
        let sm = StateMachine::new();
        assert_eq!(sm.current(), EngineState::Paused);
    }

    #[test]
    fn valid_transition_succeeds() {
        let sm = StateMachine::new();
        let changed = sm
            .try_transition(EngineState::InWait, &[EngineState::Paused])
            .unwrap();
        assert!(changed);
        assert_eq!(sm.current(), EngineState::InWait);
    }

    #[test]
    fn unexpected_from_is_noop() {
        let sm = StateMachine::new();
        let changed = sm
            .try_transition(EngineState::InTick, &[EngineState::InWait])
            .unwrap();
        assert!(!changed);
        assert_eq!(sm.current(), EngineState::Paused);
    }

    #[test]
    fn transitions_from_stopped_always_error() {
        let sm = StateMachine::new();
        sm.force_stop();
        let result = sm.try_transition(EngineState::Paused, &[EngineState::Stopped]);
        assert!(matches!(result, Err(EngineError::EngineStopped)));
    }

    #[test]
    fn force_stop_is_idempotent() {
        let sm = StateMachine::new();
        assert!(sm.force_stop());
        assert!(!sm.force_stop());
        assert_eq!(sm.current(), EngineState::Stopped);
    }
}
