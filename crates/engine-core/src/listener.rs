use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::state::EngineState;

/// Receives notifications when the engine's state changes.
pub trait EngineListener: Send + Sync {
    fn state_changed(&self, new_state: EngineState, old_state: EngineState);
}

/// A thread-safe, iteration-safe collection of listeners.
///
/// Membership is read as a cloned snapshot under a brief read lock, then
/// iterated without holding any lock, so adding/removing listeners never
/// blocks on or is blocked by an in-progress fan-out. A panic in one
/// listener is caught and logged; it never stops the remaining listeners
/// from being notified.
pub struct ListenerSet<L: ?Sized> {
    members: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> ListenerSet<L> {
    pub fn new() -> Self {
        Self {
            members: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, listener: Arc<L>) {
        self.members.write().push(listener);
    }

    pub fn remove(&self, listener: &Arc<L>) -> bool {
        let mut guard = self.members.write();
        let before = guard.len();
        guard.retain(|l| !Arc::ptr_eq(l, listener));
        guard.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<L>> {
        self.members.read().clone()
    }
}

impl<L: ?Sized> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl ListenerSet<dyn EngineListener> {
    pub fn notify_state_changed(&self, new_state: EngineState, old_state: EngineState) {
        for listener in self.snapshot() {
            let result = catch_unwind(AssertUnwindSafe(|| {
                listener.state_changed(new_state, old_state);
            }));
            if result.is_err() {
                warn!("engine listener panicked during state_changed");
            }
        }
    }
}
