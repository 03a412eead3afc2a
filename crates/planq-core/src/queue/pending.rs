//! Backlog entries and the handle the applier works on.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use super::future::{PlanOutcome, Promise};
use crate::domain::Plan;

/// A plan waiting in the backlog.
///
/// Ordered so that `BinaryHeap` pops the highest priority first and, within
/// one priority, the lowest insertion sequence first.
#[derive(Debug)]
pub(crate) struct QueuedPlan {
    pub(crate) plan: Plan,
    pub(crate) sequence: u64,
    pub(crate) enqueued_at: DateTime<Utc>,
    pub(crate) promise: Promise,
}

impl QueuedPlan {
    pub(crate) fn into_pending(self) -> PendingPlan {
        PendingPlan {
            plan: self.plan,
            sequence: self.sequence,
            enqueued_at: self.enqueued_at,
            promise: self.promise,
        }
    }
}

impl PartialEq for QueuedPlan {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for QueuedPlan {}

impl PartialOrd for QueuedPlan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedPlan {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: larger priority wins, then smaller sequence wins
        self.plan
            .priority
            .cmp(&other.plan.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// A plan handed to the applier by [`PlanQueue::dequeue`](super::PlanQueue::dequeue).
///
/// The applier owns it exclusively. [`respond`](Self::respond) consumes the
/// handle, so a plan can be answered at most once. Dropping it unanswered
/// resolves the submitter's future with
/// [`PlanQueueError::Abandoned`](crate::error::PlanQueueError::Abandoned).
#[derive(Debug)]
pub struct PendingPlan {
    plan: Plan,
    sequence: u64,
    enqueued_at: DateTime<Utc>,
    promise: Promise,
}

impl PendingPlan {
    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Insertion sequence assigned at enqueue time.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the plan entered the backlog.
    pub fn enqueued_at(&self) -> DateTime<Utc> {
        self.enqueued_at
    }

    /// Deliver the outcome to the submitter.
    ///
    /// Does not touch the queue, so a slow applier never blocks producers.
    pub fn respond(self, outcome: PlanOutcome) {
        self.promise.fulfill(outcome);
    }
}
