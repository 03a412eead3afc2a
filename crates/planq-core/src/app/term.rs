//! LeaderTerm - leader 期間ごとの PlanQueue の所有者
//!
//! A fresh queue is built for every term and dropped with it, so nothing
//! queued under one leader can be applied under the next.

use std::sync::Arc;

use tracing::info;

use super::applier::Applier;
use crate::config::PlanQueueConfig;
use crate::observability::StatsReporter;
use crate::ports::PlanCommitter;
use crate::queue::PlanQueue;

/// Everything the leader runs for plan application during one term.
pub struct LeaderTerm {
    term: u64,
    queue: Arc<PlanQueue>,
    applier: Applier,
    reporter: StatsReporter,
}

impl LeaderTerm {
    /// Enable a new queue and start the applier and stats reporter.
    ///
    /// Must be called from within a tokio runtime.
    pub fn establish(
        term: u64,
        config: &PlanQueueConfig,
        committer: Arc<dyn PlanCommitter>,
    ) -> Self {
        let queue = Arc::new(PlanQueue::new());
        queue.set_enabled(true);

        let applier = Applier::spawn(Arc::clone(&queue), committer, config.dequeue_timeout);
        let reporter = StatsReporter::spawn(Arc::clone(&queue), config.stats_interval);

        info!(term, "leader term established");
        Self {
            term,
            queue,
            applier,
            reporter,
        }
    }

    pub fn term(&self) -> u64 {
        self.term
    }

    /// Shared handle for producers.
    pub fn queue(&self) -> Arc<PlanQueue> {
        Arc::clone(&self.queue)
    }

    /// Step down: flush the queue, then stop the applier and reporter.
    ///
    /// A plan already handed to the applier is still answered. Returns the
    /// number of plans the applier answered during the term.
    pub async fn revoke(self) -> u64 {
        // 先に disable して、以降の enqueue を拒否 + 残りを flush
        self.queue.set_enabled(false);
        let answered = self.applier.shutdown_and_join().await;
        self.reporter.shutdown_and_join().await;
        info!(term = self.term, answered, "leader term revoked");
        answered
    }
}
