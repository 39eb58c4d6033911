use std::collections::BTreeMap;
use std::time::Instant;

use dashmap::DashMap;
use engine_core::{ActionId, CancelFlag, Job};
use parking_lot::Mutex;

/// Queued jobs plus the index of jobs currently executing on the pool.
///
/// The queue itself is a `BTreeMap<(Instant, ActionId), Job>` under a single
/// coarse mutex — inserts, by-id lookups, and cutoff drains are all O(log n).
/// In-flight jobs live in a separate `DashMap` keyed by id, each entry
/// carrying the job's cooperative-cancellation flag; a job is never in both
/// places at once.
pub struct JobBoard {
    queue: Mutex<BTreeMap<(Instant, ActionId), Job>>,
    index: Mutex<std::collections::HashMap<ActionId, Instant>>,
    in_flight: DashMap<ActionId, CancelFlag>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(BTreeMap::new()),
            index: Mutex::new(std::collections::HashMap::new()),
            in_flight: DashMap::new(),
        }
    }

    pub fn insert(&self, job: Job) {
        let id = job.id();
        let estimated = job.estimated;
        let mut queue = self.queue.lock();
        let mut index = self.index.lock();
        if let Some(old_estimated) = index.insert(id, estimated) {
            queue.remove(&(old_estimated, id));
        }
        queue.insert((estimated, id), job);
    }

    /// Removes and returns every job whose estimated time is strictly before
    /// `cutoff`, in ascending order.
    pub fn drain_before(&self, cutoff: Instant) -> Vec<Job> {
        let mut queue = self.queue.lock();
        let mut index = self.index.lock();
        // nil is the smallest Uuid, so this upper bound captures exactly
        // the keys with estimated time strictly less than `cutoff`.
        let due_keys: Vec<(Instant, ActionId)> = queue
            .range(..(cutoff, ActionId::nil()))
            .map(|(k, _)| *k)
            .collect();
        let mut drained = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            if let Some(job) = queue.remove(&key) {
                index.remove(&key.1);
                drained.push(job);
            }
        }
        drained
    }

    pub fn remove_by_id(&self, id: ActionId) -> bool {
        // Lock queue before index, same order as insert/drain_before, so
        // concurrent callers can't deadlock on inverted lock acquisition.
        let mut queue = self.queue.lock();
        let mut index = self.index.lock();
        if let Some(estimated) = index.remove(&id) {
            queue.remove(&(estimated, id)).is_some()
        } else {
            false
        }
    }

    pub fn contains_queued(&self, id: ActionId) -> bool {
        self.index.lock().contains_key(&id)
    }

    pub fn mark_in_flight(&self, id: ActionId, flag: CancelFlag) {
        self.in_flight.insert(id, flag);
    }

    pub fn mark_done(&self, id: ActionId) {
        self.in_flight.remove(&id);
    }

    pub fn is_in_flight(&self, id: ActionId) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// `cancel`: if in flight, request cooperative cancellation and report
    /// success; otherwise remove it from the queue if present.
    pub fn cancel(&self, id: ActionId) -> bool {
        if let Some(flag) = self.in_flight.get(&id) {
            flag.set();
            return true;
        }
        self.remove_by_id(id)
    }

    pub fn is_active(&self, id: ActionId) -> bool {
        self.is_in_flight(id) || self.contains_queued(id)
    }

    /// Drops every queued job. Used by `stop()`; in-flight jobs are
    /// cancellation-flagged separately by the caller.
    pub fn clear_queue(&self) {
        self.queue.lock().clear();
        self.index.lock().clear();
    }

    /// Cancellation flags for every job currently in flight, for `stop()`.
    pub fn in_flight_flags(&self) -> Vec<CancelFlag> {
        self.in_flight.iter().map(|e| e.value().clone()).collect()
    }
}

impl Default for JobBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Action, ActionContext, Actor, EngineHandle, TickInfo};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoopHandle;
    impl EngineHandle for NoopHandle {
        fn cancel(&self, _id: ActionId) -> bool {
            false
        }
        fn tick_info(&self) -> Arc<TickInfo> {
            Arc::new(TickInfo::new(1))
        }
        fn bindings(&self) -> Arc<engine_core::Bindings> {
            Arc::new(engine_core::Bindings::new())
        }
    }

    struct Noop;
    impl Action for Noop {
        fn perform(&self, _context: &ActionContext) {}
    }

    fn make_job(estimated: Instant) -> Job {
        let actor: Actor = Arc::new(());
        let context = ActionContext::new(
            ActionId::new_v4(),
            actor,
            Arc::new(NoopHandle),
            Duration::ZERO,
            CancelFlag::new(),
        );
        Job {
            action: Arc::new(Noop),
            context,
            estimated,
        }
    }

    #[test]
    fn drain_before_only_returns_strictly_earlier_jobs() {
        let board = JobBoard::new();
        let now = Instant::now();
        let early = make_job(now - Duration::from_millis(10));
        let late = make_job(now + Duration::from_secs(10));
        let early_id = early.id();
        board.insert(early);
        board.insert(late);

        let due = board.drain_before(now);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), early_id);
        assert!(board.contains_queued(due[0].id()) == false);
    }

    #[test]
    fn cancel_in_queue_removes_without_running() {
        let board = JobBoard::new();
        let job = make_job(Instant::now() + Duration::from_secs(5));
        let id = job.id();
        board.insert(job);
        assert!(board.cancel(id));
        assert!(!board.is_active(id));
    }

    #[test]
    fn cancel_in_flight_sets_flag_instead_of_removing() {
        let board = JobBoard::new();
        let job = make_job(Instant::now());
        let id = job.id();
        let flag = job.context.cancel_flag();
        board.mark_in_flight(id, flag.clone());
        assert!(board.cancel(id));
        assert!(flag.is_set());
        assert!(board.is_active(id));
        board.mark_done(id);
        assert!(!board.is_active(id));
    }
}
