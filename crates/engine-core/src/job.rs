use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::time::Instant;

use crate::action::{Action, ActionContext, ActionId};

/// A scheduled unit of work: an action bound to a context, with its next
/// estimated execution time. Ordered ascending by estimated time, with the
/// action id as a tie-breaker so simultaneous estimates still admit a total
/// order.
pub struct Job {
    pub action: Arc<dyn Action>,
    pub context: ActionContext,
    pub estimated: Instant,
}

impl Job {
    pub fn id(&self) -> ActionId {
        self.context.id()
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.estimated == other.estimated && self.id() == other.id()
    }
}
impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.estimated
            .cmp(&other.estimated)
            .then_with(|| self.id().cmp(&other.id()))
    }
}
