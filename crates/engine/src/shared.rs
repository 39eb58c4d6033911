use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine_core::{
    Action, ActionContext, ActionId, Actor, Bindings, CancelFlag, EngineError, EngineHandle,
    EngineListener, EngineResult, EngineState, Job, ListenerSet, StateMachine, TickInfo,
};
use engine_scheduler::JobBoard;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::EngineConfig;

/// A hook (first/last action) bound to a fixed actor. Unlike a `Job`, it
/// carries no estimated time and is never placed on the job board.
struct Hook {
    action: Arc<dyn Action>,
    context: ActionContext,
}

/// State shared by both engine variants: the state machine, bindings, tick
/// statistics, job board, listener set, and first/last hook slots.
///
/// `Shared` implements `EngineHandle` so `ActionContext`s created through it
/// can call back into `cancel`/`tick_info`/`bindings` without depending on
/// the concrete continuous/manual engine type. Callers hold it behind an
/// `Arc` so contexts can keep a cloneable handle alive independently of the
/// engine façade.
pub struct Shared {
    pub(crate) config: EngineConfig,
    pub(crate) state: StateMachine,
    pub(crate) bindings: Arc<Bindings>,
    pub(crate) tick_info: Arc<TickInfo>,
    pub(crate) board: Arc<JobBoard>,
    pub(crate) listeners: ListenerSet<dyn EngineListener>,
    first_hook: Mutex<Option<Hook>>,
    last_hook: Mutex<Option<Hook>>,
    stopping: AtomicBool,
}

impl Shared {
    pub fn new(config: EngineConfig) -> Self {
        let tick_info = Arc::new(TickInfo::new(config.tps()));
        Self {
            config,
            state: StateMachine::new(),
            bindings: Arc::new(Bindings::new()),
            tick_info,
            board: Arc::new(JobBoard::new()),
            listeners: ListenerSet::new(),
            first_hook: Mutex::new(None),
            last_hook: Mutex::new(None),
            stopping: AtomicBool::new(false),
        }
    }

    fn ensure_running(&self) -> EngineResult<()> {
        if self.state.current() == EngineState::Stopped {
            return Err(EngineError::EngineStopped);
        }
        Ok(())
    }

    pub fn schedule(
        self: &Arc<Self>,
        action: Arc<dyn Action>,
        actor: Actor,
        initial_delay: Duration,
        period: Duration,
    ) -> EngineResult<ActionId> {
        self.ensure_running()?;
        let id = Uuid::new_v4();
        let context = ActionContext::new(
            id,
            actor,
            self.clone() as Arc<dyn EngineHandle>,
            period,
            CancelFlag::new(),
        );
        let job = Job {
            action,
            context,
            estimated: std::time::Instant::now() + initial_delay,
        };
        self.board.insert(job);
        Ok(id)
    }

    pub fn cancel(&self, id: ActionId) -> EngineResult<bool> {
        self.ensure_running()?;
        Ok(self.board.cancel(id))
    }

    pub fn is_active(&self, id: ActionId) -> EngineResult<bool> {
        self.ensure_running()?;
        Ok(self.board.is_active(id))
    }

    pub fn set_first_action(
        self: &Arc<Self>,
        action: Arc<dyn Action>,
        actor: Actor,
    ) -> EngineResult<()> {
        self.ensure_running()?;
        *self.first_hook.lock() = Some(self.make_hook(action, actor));
        Ok(())
    }

    pub fn set_last_action(
        self: &Arc<Self>,
        action: Arc<dyn Action>,
        actor: Actor,
    ) -> EngineResult<()> {
        self.ensure_running()?;
        *self.last_hook.lock() = Some(self.make_hook(action, actor));
        Ok(())
    }

    fn make_hook(self: &Arc<Self>, action: Arc<dyn Action>, actor: Actor) -> Hook {
        let context = ActionContext::new(
            Uuid::new_v4(),
            actor,
            self.clone() as Arc<dyn EngineHandle>,
            Duration::ZERO,
            CancelFlag::new(),
        );
        Hook { action, context }
    }

    pub(crate) fn run_first_hook(&self) {
        if let Some(hook) = self.first_hook.lock().as_ref() {
            engine_scheduler::run_hook(hook.action.as_ref(), &hook.context);
        }
    }

    pub(crate) fn run_last_hook(&self) {
        if let Some(hook) = self.last_hook.lock().as_ref() {
            engine_scheduler::run_hook(hook.action.as_ref(), &hook.context);
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.current()
    }

    pub fn tick_info(&self) -> Arc<TickInfo> {
        self.tick_info.clone()
    }

    pub fn bindings(&self) -> Arc<Bindings> {
        self.bindings.clone()
    }

    pub fn add_listener(&self, listener: Arc<dyn EngineListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn EngineListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Transitions the state machine and notifies listeners iff the
    /// transition actually occurred.
    pub(crate) fn transition(
        &self,
        new_state: EngineState,
        expected_from: &[EngineState],
    ) -> EngineResult<bool> {
        let old_state = self.state.current();
        let changed = self.state.try_transition(new_state, expected_from)?;
        if changed {
            self.listeners.notify_state_changed(new_state, old_state);
        }
        Ok(changed)
    }

    /// Core of `stop()`: drops queued jobs, flags in-flight jobs for
    /// cooperative cancellation, forces the state to `Stopped`, and returns
    /// the flags so the caller can decide how long to wait for them.
    /// Idempotent: a second call observes `stopping` already set and is a
    /// no-op, matching the façade's "idempotent once Stopped" contract.
    pub(crate) fn begin_stop(&self) -> Vec<CancelFlag> {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }
        let old_state = self.state.current();
        let flags = self.board.in_flight_flags();
        for flag in &flags {
            flag.set();
        }
        self.board.clear_queue();
        if self.state.force_stop() {
            self.listeners
                .notify_state_changed(EngineState::Stopped, old_state);
        }
        flags
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl EngineHandle for Shared {
    fn cancel(&self, id: ActionId) -> bool {
        self.board.cancel(id)
    }

    fn tick_info(&self) -> Arc<TickInfo> {
        self.tick_info.clone()
    }

    fn bindings(&self) -> Arc<Bindings> {
        self.bindings.clone()
    }
}
