//! Plan and plan result: the payloads that travel through the queue.
//!
//! The queue only reads `priority`. Everything else is carried for the
//! applier and the submitter.

use serde::{Deserialize, Serialize};

use super::ids::{EvalId, JobId};

/// A proposed state transition produced by a scheduling worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Evaluation this plan was computed for.
    pub eval_id: EvalId,

    /// Job the plan places allocations for, if any.
    pub job_id: Option<JobId>,

    /// Higher is more urgent.
    pub priority: i32,

    /// Raft index at which the evaluation was created.
    pub eval_create_index: u64,

    /// Opaque plan body (allocations, evictions, ...).
    pub payload: serde_json::Value,
}

impl Plan {
    pub fn new(eval_id: EvalId, priority: i32, eval_create_index: u64) -> Self {
        Self {
            eval_id,
            job_id: None,
            priority,
            eval_create_index,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_job(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// What got committed for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// Log index at which the plan's allocations were committed.
    pub alloc_index: u64,

    pub payload: serde_json::Value,
}

impl PlanResult {
    pub fn new(alloc_index: u64) -> Self {
        Self {
            alloc_index,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
