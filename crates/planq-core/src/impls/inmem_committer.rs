//! InMemoryCommitter - 開発用・テスト用の PlanCommitter
//!
//! Assigns increasing alloc indexes and remembers every committed plan in
//! commit order. Optionally rejects plans below a priority threshold,
//! sleeps to simulate log latency, and can be switched unavailable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{Plan, PlanResult};
use crate::error::CommitError;
use crate::ports::PlanCommitter;

struct CommitLog {
    next_index: u64,
    committed: Vec<Plan>,
}

pub struct InMemoryCommitter {
    log: Mutex<CommitLog>,
    reject_below: Option<i32>,
    latency: Duration,
    available: AtomicBool,
}

impl InMemoryCommitter {
    /// Commit log whose first entry gets `start_index`.
    pub fn new(start_index: u64) -> Self {
        Self {
            log: Mutex::new(CommitLog {
                next_index: start_index,
                committed: Vec::new(),
            }),
            reject_below: None,
            latency: Duration::ZERO,
            available: AtomicBool::new(true),
        }
    }

    /// Reject every plan whose priority is below `priority`.
    pub fn reject_below(mut self, priority: i32) -> Self {
        self.reject_below = Some(priority);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// While unavailable, every commit fails with [`CommitError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Plans committed so far, in commit order.
    pub fn committed(&self) -> Vec<Plan> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .committed
            .clone()
    }
}

impl Default for InMemoryCommitter {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl PlanCommitter for InMemoryCommitter {
    async fn commit(&self, plan: &Plan) -> Result<PlanResult, CommitError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if !self.available.load(Ordering::SeqCst) {
            return Err(CommitError::Unavailable("commit log is offline".into()));
        }

        if let Some(threshold) = self.reject_below
            && plan.priority < threshold
        {
            return Err(CommitError::Rejected(format!(
                "priority {} below {}",
                plan.priority, threshold
            )));
        }

        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        let index = log.next_index;
        log.next_index += 1;
        log.committed.push(plan.clone());

        Ok(PlanResult::new(index).with_payload(json!({ "eval_id": plan.eval_id })))
    }
}
