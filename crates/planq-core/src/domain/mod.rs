//! Domain model (ids, plans, plan results).

pub mod ids;
pub mod plan;

pub use ids::{EvalId, JobId};
pub use plan::{Plan, PlanResult};
