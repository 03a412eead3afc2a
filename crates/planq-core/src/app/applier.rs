//! Applier - plan を 1 件ずつ commit するループ
//!
//! # フロー
//! 1. PlanQueue::dequeue() で最優先の plan を取得
//! 2. PlanCommitter::commit() で永続化
//! 3. PendingPlan::respond() で submitter に結果を返す

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PlanQueueError;
use crate::ports::PlanCommitter;
use crate::queue::PlanQueue;

/// Handle to the background apply loop.
/// - `request_shutdown()` stops it from taking new plans
/// - `shutdown_and_join()` also waits for the in-flight plan to be answered
pub struct Applier {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl Applier {
    pub fn spawn(
        queue: Arc<PlanQueue>,
        committer: Arc<dyn PlanCommitter>,
        dequeue_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(apply_loop(queue, committer, dequeue_timeout, shutdown_rx));
        Self { shutdown_tx, join }
    }

    pub fn request_shutdown(&self) {
        // receiver may already be gone if the loop exited
        let _ = self.shutdown_tx.send(true);
    }

    /// Shut down and wait. Returns the number of plans the loop answered.
    pub async fn shutdown_and_join(self) -> u64 {
        self.request_shutdown();
        match self.join.await {
            Ok(applied) => applied,
            Err(e) => {
                warn!(error = %e, "applier task failed");
                0
            }
        }
    }
}

async fn apply_loop(
    queue: Arc<PlanQueue>,
    committer: Arc<dyn PlanCommitter>,
    dequeue_timeout: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> u64 {
    info!("plan applier started");
    let mut answered = 0u64;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // dequeue は cancel-safe なので shutdown と競合させてよい
        let pending = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            pending = queue.dequeue(dequeue_timeout) => pending,
        };

        let Some(pending) = pending else {
            continue;
        };
        let queued_ms = (Utc::now() - pending.enqueued_at()).num_milliseconds();

        let outcome = match committer.commit(pending.plan()).await {
            Ok(result) => {
                debug!(
                    sequence = pending.sequence(),
                    queued_ms,
                    alloc_index = result.alloc_index,
                    "plan applied"
                );
                Ok(Arc::new(result))
            }
            Err(e) => {
                warn!(
                    sequence = pending.sequence(),
                    queued_ms,
                    eval_id = %pending.plan().eval_id,
                    error = %e,
                    "failed to apply plan"
                );
                Err(PlanQueueError::Apply(e.to_string()))
            }
        };
        pending.respond(outcome);
        answered += 1;
    }

    info!(answered, "plan applier stopped");
    answered
}
