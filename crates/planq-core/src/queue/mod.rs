//! Queue module: the plan queue, its backlog entries and result futures.

mod future;
mod pending;
mod plan_queue;

pub use future::{PlanFuture, PlanOutcome};
pub use pending::PendingPlan;
pub use plan_queue::{PlanQueue, QueueStats};
