//! Periodic queue stats reporting.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::queue::PlanQueue;

/// Emits the queue depth as a structured event every `interval`.
pub struct StatsReporter {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl StatsReporter {
    pub fn spawn(queue: Arc<PlanQueue>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let stats = queue.stats();
                        info!(target: "plan_queue", depth = stats.depth, "plan queue stats");
                    }
                }
            }
        });
        Self { shutdown_tx, join }
    }

    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}
