use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::bindings::Bindings;
use crate::tick_info::TickInfo;

/// Identity of a scheduled action, issued fresh at schedule time.
pub type ActionId = Uuid;

pub type Actor = Arc<dyn Any + Send + Sync>;

/// A unit of work run by the engine against an opaque actor.
///
/// Any panic raised here is caught by the job runner, logged, and never
/// propagated. Implementations should poll `ActionContext::is_cancelled`
/// in long-running loops to cooperate with `cancel()`.
pub trait Action: Send + Sync {
    fn perform(&self, context: &ActionContext);
}

impl<F> Action for F
where
    F: Fn(&ActionContext) + Send + Sync,
{
    fn perform(&self, context: &ActionContext) {
        self(context)
    }
}

/// The subset of the façade an `ActionContext` needs to request its own
/// cancellation, exposed as a trait object so contexts don't depend on the
/// concrete engine type.
pub trait EngineHandle: Send + Sync {
    fn cancel(&self, id: ActionId) -> bool;
    fn tick_info(&self) -> Arc<TickInfo>;
    fn bindings(&self) -> Arc<Bindings>;
}

/// Cooperative-cancellation flag shared between the scheduler and a running
/// job. Rust has no forcible thread interrupt; this is the polled substitute.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Passed to every `Action::perform` invocation.
pub struct ActionContext {
    id: ActionId,
    actor: Actor,
    engine: Arc<dyn EngineHandle>,
    period: Duration,
    cancel_flag: CancelFlag,
}

impl ActionContext {
    pub fn new(
        id: ActionId,
        actor: Actor,
        engine: Arc<dyn EngineHandle>,
        period: Duration,
        cancel_flag: CancelFlag,
    ) -> Self {
        Self {
            id,
            actor,
            engine,
            period,
            cancel_flag,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Downcasts the actor to a concrete type, returning `None` on mismatch.
    pub fn actor_as<T: 'static>(&self) -> Option<Arc<T>> {
        self.actor.clone().downcast::<T>().ok()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_periodic(&self) -> bool {
        !self.period.is_zero()
    }

    pub fn tick_info(&self) -> Arc<TickInfo> {
        self.engine.tick_info()
    }

    pub fn bindings(&self) -> Arc<Bindings> {
        self.engine.bindings()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.is_set()
    }

    /// Clone of this context's cancellation flag, used by the scheduler to
    /// register the job as in-flight under the same flag `is_cancelled`
    /// reads from.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel_flag.clone()
    }

    pub fn cancel(&self) -> bool {
        self.engine.cancel(self.id)
    }
}
